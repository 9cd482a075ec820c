use std::fmt::{ Debug, Display };

/// Standard format for activity logs: component - message: details
pub fn log_activity(component: &str, message: &str, details: Option<&str>) {
    let details_str = details.unwrap_or("");
    log::info!("{} - {}: {}", component, message, details_str);
}

/// Standard format for error logs: component - ERROR - context: error
pub fn log_error(component: &str, context: &str, err: &dyn Display) {
    log::error!("{} - ERROR - {}: {}", component, context, err);
}

/// Log debug information
pub fn log_debug<T: Debug>(component: &str, context: &str, details: &T) {
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("{} - {} - Details: {:?}", component, context, details);
    }
}

/// Activity log scoped to a table: component (table) - message: details
pub fn log_table_activity(component: &str, table: &str, message: &str, details: Option<&str>) {
    let details_str = details.unwrap_or("");
    log::info!("{} ({}) - {}: {}", component, table, message, details_str);
}

/// Warning log scoped to a table: component (table) - WARN - context: detail
pub fn log_table_warning(component: &str, table: &str, context: &str, detail: &dyn Display) {
    log::warn!("{} ({}) - WARN - {}: {}", component, table, context, detail);
}

/// Error log scoped to a table: component (table) - ERROR - context: error
pub fn log_table_error(component: &str, table: &str, context: &str, err: &dyn Display) {
    log::error!("{} ({}) - ERROR - {}: {}", component, table, context, err);
}
