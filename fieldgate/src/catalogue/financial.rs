//! Fees and payment data. Staff access is bounded by region.

use crate::catalogue::{GroupProvider, ADMIN, REGIONAL_ADMIN, TREASURER};
use crate::rule::ConditionalRule;
use crate::types::{DataType, FieldDefinition, InputType, PermissionConfig, ValidationCheck, ValidationRule};

pub struct FinancialGroup;

impl GroupProvider for FinancialGroup {
    fn group(&self) -> &'static str {
        "financial"
    }

    fn fields(&self) -> Vec<FieldDefinition> {
        let group = self.group();
        let finance = PermissionConfig::new()
            .view([ADMIN, REGIONAL_ADMIN, TREASURER])
            .edit([ADMIN, TREASURER])
            .regional();

        vec![
            FieldDefinition::new("iban", "IBAN", DataType::String, group)
                .order(1)
                .validate(
                    ValidationRule::new(ValidationCheck::Pattern {
                        value: r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{10,30}$".to_string(),
                    })
                    .message("Enter the IBAN without spaces"),
                )
                .required_when(ConditionalRule::equals("payment_method", "direct-debit"))
                .permissions(finance.clone()),
            FieldDefinition::new("payment_method", "Payment method", DataType::Enum, group)
                .order(2)
                .input(InputType::Radio)
                .options([
                    ("direct-debit", "Direct debit"),
                    ("invoice", "Invoice"),
                    ("cash", "Cash"),
                ])
                .gate_option("cash", [TREASURER])
                .permissions(finance.clone()),
            FieldDefinition::new("annual_fee", "Annual fee", DataType::Number, group)
                .order(3)
                .input(InputType::Currency)
                .validate(ValidationRule::new(ValidationCheck::Min { value: 0.0 }))
                .permissions(finance.clone()),
            FieldDefinition::new("paid_until", "Paid until", DataType::Date, group)
                .order(4)
                .permissions(finance.clone()),
            FieldDefinition::new("outstanding_balance", "Outstanding", DataType::Number, group)
                .order(5)
                .input(InputType::Currency)
                .permissions(finance),
        ]
    }
}
