#[cfg(test)]
mod tests {
    use crate::security::*;
    use crate::{Permission, TenantId};

    #[test]
    fn test_email_validation() {
        use crate::utils::validate_email;

        assert!(validate_email("user@example.com"));
        assert!(validate_email("test.email+tag@domain.co.uk"));

        assert!(!validate_email("invalid-email"));
        assert!(!validate_email("@domain.com"));
        assert!(!validate_email("user@"));
    }

    #[test]
    fn test_permission_creation() {
        let permission = Permission::new("case", "read");
        assert_eq!(permission.resource, "case");
        assert_eq!(permission.action, "read");
        assert_eq!(permission.to_string(), "case:read");
    }

    #[test]
    fn test_tenant_id_serialization() {
        use uuid::Uuid;

        let tenant_id = TenantId(Uuid::new_v4());
        let serialized = serde_json::to_string(&tenant_id).unwrap();
        let deserialized: TenantId = serde_json::from_str(&serialized).unwrap();

        assert_eq!(tenant_id.0, deserialized.0);
    }

    #[test]
    fn test_receipt_code_end_to_end() {
        let code = ReceiptCode::generate();
        assert!(ReceiptCode::is_valid(&code));

        let display = ReceiptCode::format_for_display(&code);
        assert_eq!(ReceiptCode::normalize(&display), code);
    }
}
