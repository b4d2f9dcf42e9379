use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogCode {
    pub code: String,
    pub description: String,
}

/// Codes seeded into a fresh `log_codes` table
pub const DEFAULT_LOG_CODES: [(&str, &str); 18] = [
    ("PURGE", "Data Purging Process"),
    ("LOGGN", "Logging Process"),
    ("STRMN", "Streaming Process"),
    ("SYPRG", "System Purge"),
    ("START", "System Startup"),
    ("FSTOP", "System Shutdown"),
    ("CONCH", "Configuration Change"),
    ("CONAD", "Configuration Addition"),
    ("SCHCH", "Schedule Change"),
    ("SCHAD", "Schedule Addition"),
    ("SRVRG", "Service Registered"),
    ("SRVUN", "Service Unregistered"),
    ("SRVFL", "Service Fail"),
    ("NHCOM", "North Process Complete"),
    ("NHDWN", "North Destination Unavailable"),
    ("NHAVL", "North Destination Available"),
    ("UPEXC", "Update Complete"),
    ("BKEXC", "Backup Complete"),
];

pub fn default_log_codes() -> Vec<LogCode> {
    DEFAULT_LOG_CODES
        .iter()
        .map(|(code, description)| LogCode {
            code: code.to_string(),
            description: description.to_string(),
        })
        .collect()
}
