//! Builder patterns for creating job payloads programmatically.
//!
//! `PayloadBuilder::new()` starts from a complete, valid estimation request
//! so each test only spells out what it changes.

#![allow(dead_code)]

use serde_json::{json, Value};

use erpflow::JobPayload;

/// Builder for estimation request payloads in their wire (JSON) form.
pub struct PayloadBuilder {
    company: Option<Value>,
    user: Option<Value>,
    financial_year: Option<String>,
    job: Value,
    size: Value,
    material: Value,
    printing: Value,
    finishing: Value,
    required: Vec<Value>,
    content_based: Vec<Value>,
    optional: Vec<Value>,
}

impl PayloadBuilder {
    /// A complete request: both logins, every form segment, no processes.
    pub fn new() -> Self {
        Self {
            company: Some(json!({"username": "acme-print", "password": "company-secret"})),
            user: Some(json!({"username": "estimator@acme.example", "password": "user-secret"})),
            financial_year: None,
            job: json!({
                "client": "Acme Packaging",
                "contentType": "Carton Box",
                "quantity": 5000,
                "jobName": "Tea carton 250g"
            }),
            size: json!({
                "closedHeight": 180,
                "closedLength": "120",
                "openHeight": "360",
                "openLength": "240.5"
            }),
            material: json!({"quality": "Real Art Paper", "gsm": 300}),
            printing: json!({"frontColors": 4, "backColors": "0", "style": "Single Side"}),
            finishing: json!({
                "makeReadyCount": 150,
                "coating": "Aqueous Varnish",
                "trimMargins": [3, 3, "2.5", "2.5"]
            }),
            required: Vec::new(),
            content_based: Vec::new(),
            optional: Vec::new(),
        }
    }

    pub fn without_company(mut self) -> Self {
        self.company = None;
        self
    }

    pub fn without_user(mut self) -> Self {
        self.user = None;
        self
    }

    pub fn financial_year(mut self, year: &str) -> Self {
        self.financial_year = Some(year.to_string());
        self
    }

    pub fn client(mut self, client: &str) -> Self {
        self.job["client"] = json!(client);
        self
    }

    pub fn quantity(mut self, quantity: &str) -> Self {
        self.job["quantity"] = json!(quantity);
        self
    }

    pub fn quality(mut self, quality: &str) -> Self {
        self.material["quality"] = json!(quality);
        self
    }

    pub fn required_process(mut self, name: &str, order: u32) -> Self {
        self.required.push(json!({"name": name, "required": true, "order": order}));
        self
    }

    pub fn content_process(mut self, name: &str, order: u32) -> Self {
        self.content_based.push(json!({"name": name, "order": order}));
        self
    }

    pub fn optional_process(mut self, name: &str, order: u32) -> Self {
        self.optional.push(json!({"name": name, "order": order}));
        self
    }

    /// The payload as it arrives on the queue.
    pub fn build(self) -> Value {
        let mut payload = json!({
            "job": self.job,
            "size": self.size,
            "material": self.material,
            "printing": self.printing,
            "finishing": self.finishing,
            "processes": {
                "required": self.required,
                "contentBased": self.content_based,
                "optional": self.optional
            }
        });
        if let Some(company) = self.company {
            payload["company"] = company;
        }
        if let Some(user) = self.user {
            payload["user"] = user;
        }
        if let Some(year) = self.financial_year {
            payload["financialYear"] = json!(year);
        }
        payload
    }

    /// The parsed payload, for driving a workflow directly.
    pub fn payload(self) -> JobPayload {
        JobPayload::from_json(self.build()).expect("builder produced an invalid payload")
    }
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}
