//! Domain error types.

/// Top-level error type for sellgap.
#[derive(Debug, thiserror::Error)]
pub enum SellgapError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {asset}")]
    NoData { asset: String },

    #[error("insufficient history for {asset}: have {bars} bars, need {minimum}")]
    InsufficientData {
        asset: String,
        bars: usize,
        minimum: usize,
    },

    #[error("real-time subscription failed: {reason}")]
    Subscription { reason: String },

    #[error("order rejected for {asset}: {reason}")]
    OrderRejected { asset: String, reason: String },
}

impl SellgapError {
    pub fn data(reason: impl Into<String>) -> Self {
        SellgapError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&SellgapError> for std::process::ExitCode {
    fn from(err: &SellgapError) -> Self {
        let code: u8 = match err {
            SellgapError::ConfigParse { .. }
            | SellgapError::ConfigMissing { .. }
            | SellgapError::ConfigInvalid { .. } => 2,
            SellgapError::Data { .. } => 3,
            SellgapError::Subscription { .. } | SellgapError::OrderRejected { .. } => 4,
            SellgapError::NoData { .. } | SellgapError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_data() {
        let err = SellgapError::InsufficientData {
            asset: "AAPL".into(),
            bars: 12,
            minimum: 63,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for AAPL: have 12 bars, need 63"
        );
    }

    #[test]
    fn display_config_invalid() {
        let err = SellgapError::ConfigInvalid {
            section: "factors".into(),
            key: "decay_rate".into(),
            reason: "must be in (0, 1]".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [factors] decay_rate: must be in (0, 1]"
        );
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;
        let code = |e: &SellgapError| format!("{:?}", ExitCode::from(e));
        let expected = |c: u8| format!("{:?}", ExitCode::from(c));

        let cfg = SellgapError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        };
        assert_eq!(code(&cfg), expected(2));
        assert_eq!(code(&SellgapError::data("boom")), expected(3));
        let none = SellgapError::NoData {
            asset: "XYZ".into(),
        };
        assert_eq!(code(&none), expected(5));
    }
}
