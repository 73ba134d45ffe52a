/// Audit macro for logging authorization events.
///
/// This macro wraps `tracing::info!` and automatically adds `audit=true`
/// and `auditType="authorization"` metadata to the log event.
///
/// # Examples
///
/// ```
/// audit!("issued session token for topic: {}", topic);
/// ```
#[macro_export]
macro_rules! audit {
    ($($arg:tt)+) => {
        $crate::middleware::with_request_info(|ctx| {
            tracing::info!(
                audit = true,
                auditType = "authorization",
                endpoint = %ctx.endpoint,
                host = %ctx.host,
                httpMethod = %ctx.method,
                $($arg)+
            )
        })
    };
}
