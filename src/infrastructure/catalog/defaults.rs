//! Built-in templates shipped with the binary

use serde_json::json;

use crate::domain::template::Template;
use crate::domain::validation::{ChoiceOption, InputDeclaration, InputType};

pub fn default_templates() -> Vec<Template> {
    vec![
        sales_lead_scraper(),
        logistics_delivery_tracker(),
        finance_payment_tracker(),
    ]
}

fn sales_lead_scraper() -> Template {
    Template::new("sales-lead-scraper", "Classified Ads Lead Scraper", "sales")
        .with_description(
            "Collects new seller leads from classified ads in one wilaya and appends them to a sheet",
        )
        .with_keywords(["lead", "classified", "ads", "ouedkniss", "prospect"])
        .with_required_input(
            InputDeclaration::new("wilaya", "Wilaya", InputType::RegionCode)
                .with_description("Wilaya where the ads are published"),
        )
        .with_required_input(
            InputDeclaration::new("category", "Ad category", InputType::Select).with_options(vec![
                ChoiceOption::new("automobiles", "Voitures"),
                ChoiceOption::new("real_estate", "Immobilier"),
                ChoiceOption::new("electronics", "Electronique"),
            ]),
        )
        .with_optional_input(
            InputDeclaration::new("max_results", "Maximum leads per run", InputType::Number)
                .with_bounds(Some(1.0), Some(500.0))
                .with_default(json!(50)),
        )
        .with_optional_input(
            InputDeclaration::new("notify_phone", "Phone for lead alerts", InputType::Phone)
                .sensitive(),
        )
        .with_execution_graph(json!({
            "name": "{{workflow_name}}",
            "nodes": [
                {
                    "name": "Schedule",
                    "type": "n8n-nodes-base.scheduleTrigger",
                    "parameters": {"rule": {"interval": [{"field": "hours", "hoursInterval": 6}]}}
                },
                {
                    "name": "Fetch Ads",
                    "type": "n8n-nodes-base.httpRequest",
                    "parameters": {
                        "url": "https://www.ouedkniss.com/{{category}}/{{wilaya}}",
                        "limit": "{{max_results}}"
                    }
                },
                {
                    "name": "Notify",
                    "type": "n8n-nodes-base.sms",
                    "parameters": {"to": "{{notify_phone}}"}
                }
            ],
            "connections": {
                "Schedule": {"main": [[{"node": "Fetch Ads", "type": "main", "index": 0}]]},
                "Fetch Ads": {"main": [[{"node": "Notify", "type": "main", "index": 0}]]}
            },
            "meta": {"conversation_id": "{{conversation_id}}", "generated_at": "{{timestamp}}"}
        }))
        .with_estimate(150.0, 300)
}

fn logistics_delivery_tracker() -> Template {
    Template::new("logistics-delivery-tracker", "Delivery Tracker", "logistics")
        .with_description("Follows parcels with a carrier and texts the customer on status changes")
        .with_keywords(["delivery", "tracking", "parcel", "yalidine", "shipment"])
        .with_required_input(
            InputDeclaration::new("carrier", "Carrier", InputType::Select).with_options(vec![
                ChoiceOption::new("yalidine", "Yalidine"),
                ChoiceOption::new("zr_express", "ZR Express"),
                ChoiceOption::new("maystro", "Maystro Delivery"),
            ]),
        )
        .with_required_input(InputDeclaration::new(
            "destination_wilaya",
            "Destination wilaya",
            InputType::RegionCode,
        ))
        .with_required_input(
            InputDeclaration::new("customer_phone", "Customer phone", InputType::Phone)
                .sensitive(),
        )
        .with_optional_input(
            InputDeclaration::new("check_interval_hours", "Check interval (hours)", InputType::Number)
                .with_bounds(Some(1.0), Some(24.0))
                .with_default(json!(6)),
        )
        .with_execution_graph(json!({
            "name": "{{workflow_name}}",
            "nodes": [
                {
                    "name": "Schedule",
                    "type": "n8n-nodes-base.scheduleTrigger",
                    "parameters": {"hoursInterval": "{{check_interval_hours}}"}
                },
                {
                    "name": "Carrier Status",
                    "type": "n8n-nodes-base.httpRequest",
                    "parameters": {"carrier": "{{carrier}}", "wilaya": "{{destination_wilaya}}"}
                },
                {
                    "name": "SMS Customer",
                    "type": "n8n-nodes-base.sms",
                    "parameters": {"to": "{{customer_phone}}"}
                }
            ],
            "connections": {
                "Schedule": {"main": [[{"node": "Carrier Status", "type": "main", "index": 0}]]},
                "Carrier Status": {"main": [[{"node": "SMS Customer", "type": "main", "index": 0}]]}
            }
        }))
        .with_estimate(80.0, 60)
}

fn finance_payment_tracker() -> Template {
    Template::new("finance-payment-tracker", "CCP Payment Tracker", "finance")
        .with_description("Matches incoming CCP and BaridiMob payments against open invoices")
        .with_keywords(["payment", "tracking", "payment tracking", "ccp"])
        .with_required_input(
            InputDeclaration::new("account_number", "CCP account number", InputType::Text)
                .with_description("CCP account number with its key, digits only")
                .with_max_length(20)
                .with_pattern(r"[0-9]{8,20}")
                .sensitive(),
        )
        .with_optional_input(
            InputDeclaration::new("reminder_days", "Days before a payment reminder", InputType::Number)
                .with_bounds(Some(1.0), Some(30.0))
                .with_default(json!(3)),
        )
        .with_execution_graph(json!({
            "name": "{{workflow_name}}",
            "nodes": [
                {
                    "name": "Daily",
                    "type": "n8n-nodes-base.scheduleTrigger",
                    "parameters": {"rule": {"interval": [{"field": "days", "daysInterval": 1}]}}
                },
                {
                    "name": "Fetch Statement",
                    "type": "n8n-nodes-base.httpRequest",
                    "parameters": {"account": "{{account_number}}"}
                },
                {
                    "name": "Reminders",
                    "type": "n8n-nodes-base.if",
                    "parameters": {"overdue_after_days": "{{reminder_days}}"}
                }
            ],
            "connections": {
                "Daily": {"main": [[{"node": "Fetch Statement", "type": "main", "index": 0}]]},
                "Fetch Statement": {"main": [[{"node": "Reminders", "type": "main", "index": 0}]]}
            },
            "meta": {"workflow_id": "{{workflow_id}}"}
        }))
        .with_estimate(120.0, 90)
}
