//! Path segment → [`ObjectRef`] parsing.

use crate::{
    models::media::{ContainerId, ObjectRef},
    services::gateway::{GatewayError, GatewayResult},
};

/// Build an [`ObjectRef`] from raw path segments.
///
/// A container starting with `@` is an alias and stays a string; anything
/// else must be a signed 64-bit peer id. The object id must be a
/// non-negative integer.
pub fn locate(container_raw: &str, object_raw: &str) -> GatewayResult<ObjectRef> {
    let container = if container_raw.starts_with('@') {
        if container_raw.len() == 1 {
            return Err(GatewayError::InvalidIdentifier(
                "container alias is empty".into(),
            ));
        }
        ContainerId::Alias(container_raw.to_string())
    } else {
        container_raw
            .parse::<i64>()
            .map(ContainerId::Numeric)
            .map_err(|_| {
                GatewayError::InvalidIdentifier(format!(
                    "container `{}` is neither a numeric id nor an @alias",
                    container_raw
                ))
            })?
    };

    let object_id = object_raw
        .parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| {
            GatewayError::InvalidIdentifier(format!(
                "object id `{}` is not a non-negative integer",
                object_raw
            ))
        })?;

    Ok(ObjectRef {
        container,
        object_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_container_is_parsed() {
        let object = locate("-1001234567890", "77").unwrap();
        assert_eq!(object.container, ContainerId::Numeric(-1001234567890));
        assert_eq!(object.object_id, 77);
    }

    #[test]
    fn alias_is_kept_verbatim() {
        let object = locate("@123", "5").unwrap();
        assert_eq!(object.container, ContainerId::Alias("@123".into()));
    }

    #[test]
    fn numeric_looking_garbage_is_rejected() {
        assert!(matches!(
            locate("12ab", "5"),
            Err(GatewayError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            locate("films", "5"),
            Err(GatewayError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            locate("@", "5"),
            Err(GatewayError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn object_id_must_be_non_negative() {
        assert!(locate("10", "0").is_ok());
        assert!(matches!(
            locate("10", "-3"),
            Err(GatewayError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            locate("10", "x"),
            Err(GatewayError::InvalidIdentifier(_))
        ));
    }
}
