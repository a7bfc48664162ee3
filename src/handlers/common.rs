use crate::errors::ServiceError;
use validator::Validate;

/// Validate request input, mapping failures to a 400 response.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(range(min = 0, max = 1))]
        flag: i32,
    }

    #[test]
    fn out_of_range_input_maps_to_bad_request() {
        let err = validate_input(&Probe { flag: 2 }).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn valid_input_passes() {
        assert!(validate_input(&Probe { flag: 1 }).is_ok());
    }
}
