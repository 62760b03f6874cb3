//! Request line sent to the update endpoint

use core::fmt::Write as _;

use heapless::String;

use crate::config::Config;
use crate::radio::RadioError;
use crate::reading::Reading;

pub const MAX_PAYLOAD_LEN: usize = 160;

pub type Payload = String<MAX_PAYLOAD_LEN>;

/// Format the averaged reading as
/// `GET /update?api_key=<key>&field<2u-1>=<t>&field<2u>=<h>\r\n`.
pub fn update_request(config: &Config<'_>, mean: Reading) -> Result<Payload, RadioError> {
    let (temperature_field, humidity_field) = config.field_numbers();
    let mut payload = Payload::new();
    write!(
        payload,
        "GET /update?api_key={}&field{}={}&field{}={}\r\n",
        config.server.api_key,
        temperature_field,
        mean.temperature_tenths(),
        humidity_field,
        mean.humidity_tenths(),
    )
    .map_err(|_| RadioError::Format {
        what: "update request",
    })?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_unit_one() {
        let mut config = Config::default();
        config.server.api_key = "XXXXXXXXXXXXXXXX";
        let payload = update_request(&config, Reading::new(220, 460)).unwrap();
        assert_eq!(
            payload.as_str(),
            "GET /update?api_key=XXXXXXXXXXXXXXXX&field1=22.0&field2=46.0\r\n"
        );
    }

    #[test]
    fn test_update_request_unit_two() {
        let mut config = Config::default();
        config.server.api_key = "KEY";
        config.server.unit = 2;
        let payload = update_request(&config, Reading::new(-15, 1000)).unwrap();
        assert_eq!(
            payload.as_str(),
            "GET /update?api_key=KEY&field3=-1.5&field4=100.0\r\n"
        );
    }

    #[test]
    fn test_oversized_key() {
        let long_key = "k".repeat(MAX_PAYLOAD_LEN);
        let mut config = Config::default();
        config.server.api_key = &long_key;
        assert!(update_request(&config, Reading::default()).is_err());
    }
}
