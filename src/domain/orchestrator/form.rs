//! Activation form returned once every required input is resolved

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::template::Template;
use crate::domain::validation::{ChoiceOption, InputType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationForm {
    pub template_id: String,
    pub title: String,
    pub description: String,
    /// Required inputs first, then optional, each in declaration order
    pub fields: Vec<FormField>,
    pub estimated_cost: f64,
    pub currency: String,
    pub estimated_duration_seconds: u64,
    /// Inference spent so far in this conversation, in DZD
    pub inference_cost: f64,
}

impl ActivationForm {
    pub fn build(
        template: &Template,
        findings: &BTreeMap<String, Value>,
        inference_cost: f64,
    ) -> Self {
        let fields = template
            .inputs()
            .map(|(input, required)| FormField {
                name: input.name.clone(),
                label: input.label.clone(),
                input_type: input.input_type,
                required,
                options: (!input.options.is_empty()).then(|| input.options.clone()),
                value: findings
                    .get(&input.name)
                    .cloned()
                    .or_else(|| input.default.clone()),
            })
            .collect();

        Self {
            template_id: template.id.clone(),
            title: template.name.clone(),
            description: template.description.clone(),
            fields,
            estimated_cost: template.estimated_cost,
            currency: template.currency.clone(),
            estimated_duration_seconds: template.estimated_duration_seconds,
            inference_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::InputDeclaration;
    use serde_json::json;

    #[test]
    fn test_build_orders_fields_and_fills_values() {
        let template = Template::new("t", "Payment Tracker", "finance")
            .with_keywords(["payment"])
            .with_required_input(InputDeclaration::new(
                "account_number",
                "Account",
                InputType::Text,
            ))
            .with_optional_input(
                InputDeclaration::new("frequency", "Frequency", InputType::Select)
                    .with_options(vec![ChoiceOption::new("daily", "Daily")])
                    .with_default(json!("daily")),
            )
            .with_estimate(200.0, 60);
        let findings = BTreeMap::from([("account_number".to_string(), json!("0012345"))]);

        let form = ActivationForm::build(&template, &findings, 1.5);

        assert_eq!(form.fields.len(), 2);
        assert_eq!(form.fields[0].name, "account_number");
        assert!(form.fields[0].required);
        assert_eq!(form.fields[0].value, Some(json!("0012345")));
        assert!(form.fields[0].options.is_none());
        assert_eq!(form.fields[1].value, Some(json!("daily")));
        assert_eq!(form.fields[1].options.as_ref().map(Vec::len), Some(1));
        assert_eq!(form.estimated_cost, 200.0);
        assert_eq!(form.estimated_duration_seconds, 60);
        assert_eq!(form.inference_cost, 1.5);
    }
}
