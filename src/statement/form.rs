//! The JSON request bodies accepted by the statement endpoints.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    date::parse_input_date,
    statement::core::{NewLineItem, OwnerScope, StatementKey},
};

/// The envelope used by the create and update endpoints: `{"cart": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartRequest {
    /// The statement to create or update.
    pub cart: CartForm,
}

/// A statement as sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartForm {
    /// The statement header.
    pub header: HeaderForm,
    /// The owner of the statement, absent for unscoped statements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserForm>,
    /// The line items of the statement.
    #[serde(rename = "Items", default)]
    pub items: Vec<ItemForm>,
}

/// The header fields of a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderForm {
    /// The period reference, e.g. "012025".
    pub reference: String,
    /// The total value of the period.
    #[serde(rename = "totalvalue")]
    pub total_value: f64,
}

/// The owner of a user-scoped statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserForm {
    /// The display name, only used when the user is created.
    #[serde(default)]
    pub name: String,
    /// The email address identifying the user.
    pub email: String,
}

/// A line item as sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemForm {
    /// The date in the format `DD/MM/YYYY`.
    pub date: String,
    /// What the expense was for.
    pub description: String,
    /// The amount spent.
    pub value: f64,
    /// The category label.
    pub classification: String,
}

/// One entry of the reference list sent to the year detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefKeyForm {
    /// The period reference to include.
    pub refkey: String,
}

impl CartForm {
    /// The key of the statement this form refers to.
    pub fn key(&self) -> StatementKey {
        StatementKey::new(
            &self.header.reference,
            OwnerScope::from_email(self.user.as_ref().map(|user| user.email.as_str())),
        )
    }
}

impl TryFrom<&ItemForm> for NewLineItem {
    type Error = Error;

    fn try_from(form: &ItemForm) -> Result<Self, Self::Error> {
        Ok(NewLineItem {
            date: parse_input_date(&form.date)?,
            description: form.description.clone(),
            value: form.value,
            classification: form.classification.clone(),
        })
    }
}

/// Parse every item of `forms`, failing on the first malformed date.
pub(crate) fn parse_items(forms: &[ItemForm]) -> Result<Vec<NewLineItem>, Error> {
    forms.iter().map(NewLineItem::try_from).collect()
}
