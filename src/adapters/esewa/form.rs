use {
    super::signature::{SIGNED_FIELD_NAMES, sign},
    crate::{config::EsewaConfig, domain::id::TransactionUuid, domain::money::MoneyAmount},
    secrecy::ExposeSecret,
    url::Url,
};

/// Signed, auto-submitting POST form that hands the browser over to the
/// gateway.
#[derive(Debug, Clone)]
pub struct PaymentForm {
    action: Url,
    fields: Vec<(&'static str, String)>,
}

impl PaymentForm {
    pub fn build(
        config: &EsewaConfig,
        amount: MoneyAmount,
        transaction_uuid: &TransactionUuid,
        success_url: &Url,
        failure_url: &Url,
    ) -> Self {
        let amount = amount.gateway_amount();
        let mut fields: Vec<(&'static str, String)> = vec![
            ("amount", amount.clone()),
            ("tax_amount", "0".into()),
            ("total_amount", amount),
            ("transaction_uuid", transaction_uuid.as_str().to_string()),
            ("product_code", config.product_code.clone()),
            ("product_service_charge", "0".into()),
            ("product_delivery_charge", "0".into()),
            ("success_url", success_url.to_string()),
            ("failure_url", failure_url.to_string()),
            ("signed_field_names", SIGNED_FIELD_NAMES.into()),
        ];

        let signed: Vec<(&str, &str)> = SIGNED_FIELD_NAMES
            .split(',')
            .filter_map(|name| {
                fields
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(n, v)| (*n, v.as_str()))
            })
            .collect();
        let signature = sign(signed, config.secret_key.expose_secret().as_bytes());
        fields.push(("signature", signature));

        Self {
            action: config.form_url.clone(),
            fields,
        }
    }

    pub fn action(&self) -> &Url {
        &self.action
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_html(&self) -> String {
        let inputs: String = self
            .fields
            .iter()
            .map(|(name, value)| {
                format!(
                    r#"<input type="hidden" name="{}" value="{}" />"#,
                    escape_html(name),
                    escape_html(value)
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html>
  <head>
    <title>eSewa Payment</title>
    <script>window.onload = function () {{ document.getElementById('esewaForm').submit(); }}</script>
  </head>
  <body>
    <h2>Redirecting to eSewa...</h2>
    <p>Please wait, you will be redirected to eSewa payment page.</p>
    <form id="esewaForm" method="POST" action="{action}">{inputs}</form>
  </body>
</html>
"#,
            action = escape_html(self.action.as_str()),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
