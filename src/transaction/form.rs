//! The fields shared by the create and edit transaction forms, and parsing
//! of what the browser sends back.

use std::sync::OnceLock;

use maud::{Markup, html};
use numfmt::{Formatter, Precision};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    transaction::{NewTransaction, TransactionPatch},
};

/// The largest whole amount an `f64` holds exactly, 2^53.
const MAX_AMOUNT: f64 = 9_007_199_254_740_992.0;

pub struct TransactionFormDefaults<'a> {
    pub name: Option<&'a str>,
    pub amount: Option<f64>,
    pub date: Date,
    pub description: Option<&'a str>,
}

pub fn transaction_form_fields(defaults: &TransactionFormDefaults<'_>) -> Markup {
    let amount_str = defaults.amount.map(format_amount_input);

    html! {
        div
        {
            label
                for="name"
                class=(FORM_LABEL_STYLE)
            {
                "Name"
            }

            input
                name="name"
                id="name"
                type="text"
                placeholder="Coffee"
                required
                autofocus
                value=[defaults.name]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="amount"
                class=(FORM_LABEL_STYLE)
            {
                "Amount (Rp)"
            }

            input
                name="amount"
                id="amount"
                type="text"
                inputmode="numeric"
                placeholder="-25.000"
                required
                value=[amount_str.as_deref()]
                class=(FORM_TEXT_INPUT_STYLE);

            @if let Some(amount) = defaults.amount {
                input type="hidden" name="original_amount" value=(amount);
            }

            p class="mt-1 text-xs text-gray-500 dark:text-gray-400"
            {
                "Start with a minus sign for expenses."
            }
        }

        div
        {
            label
                for="date"
                class=(FORM_LABEL_STYLE)
            {
                "Date"
            }

            input
                name="date"
                id="date"
                type="date"
                value=(defaults.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="description"
                class=(FORM_LABEL_STYLE)
            {
                "Description"
            }

            textarea
                name="description"
                id="description"
                rows="3"
                placeholder="Optional"
                class=(FORM_TEXT_INPUT_STYLE)
            {
                @if let Some(description) = defaults.description {
                    (description)
                }
            }
        }
    }
}

/// The form data for creating or editing a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    pub name: String,
    /// The amount as typed, e.g. "-25.000".
    pub amount: String,
    pub date: Date,
    #[serde(default)]
    pub description: Option<String>,
    /// The stored amount the edit form was prefilled with.
    #[serde(default)]
    pub original_amount: Option<f64>,
}

impl TransactionForm {
    fn validated_name(&self) -> Result<String, Error> {
        let name = self.name.trim();

        if name.is_empty() {
            Err(Error::EmptyTransactionName)
        } else {
            Ok(name.to_owned())
        }
    }

    /// The body of a create request. A blank description is left out.
    pub fn into_new_transaction(self) -> Result<NewTransaction, Error> {
        Ok(NewTransaction {
            name: self.validated_name()?,
            amount: parse_amount(&self.amount)?,
            date: self.date,
            description: self
                .description
                .map(|description| description.trim().to_owned())
                .filter(|description| !description.is_empty()),
        })
    }

    /// The amount to send with an update.
    ///
    /// The amount input only shows whole rupiah, so an untouched input keeps
    /// the exact stored amount.
    fn updated_amount(&self) -> Result<f64, Error> {
        match self.original_amount {
            Some(original) if self.amount.trim() == format_amount_input(original) => Ok(original),
            _ => parse_amount(&self.amount),
        }
    }

    /// The body of an update request.
    ///
    /// Every field is sent; a blank description clears the stored one.
    pub fn into_patch(self) -> Result<TransactionPatch, Error> {
        Ok(TransactionPatch {
            name: Some(self.validated_name()?),
            amount: Some(self.updated_amount()?),
            date: Some(self.date),
            description: Some(
                self.description
                    .map(|description| description.trim().to_owned())
                    .unwrap_or_default(),
            ),
        })
    }
}

/// Parse an amount the way the amount input masks it: a leading '-' makes
/// it negative and every other non-digit is dropped, so "-25.000" is -25000.
///
/// # Errors
///
/// Returns [Error::InvalidAmount] if `input` contains no digits or is larger
/// than 2^53, past which amounts lose precision.
pub fn parse_amount(input: &str) -> Result<f64, Error> {
    let input = input.trim();
    let is_negative = input.starts_with('-');
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();

    let magnitude: f64 = digits
        .parse()
        .ok()
        .filter(|magnitude: &f64| *magnitude <= MAX_AMOUNT)
        .ok_or_else(|| Error::InvalidAmount(input.to_owned()))?;

    if is_negative && magnitude != 0.0 {
        Ok(-magnitude)
    } else {
        Ok(magnitude)
    }
}

/// Format `amount` as whole rupiah for the amount input, e.g. "-25.000".
pub fn format_amount_input(amount: f64) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::new()
            .separator('.')
            .unwrap()
            .precision(Precision::Decimals(0))
    });

    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let negative_fmt = NEGATIVE_FMT.get_or_init(|| {
        Formatter::new()
            .separator('.')
            .and_then(|formatter| formatter.prefix("-"))
            .unwrap()
            .precision(Precision::Decimals(0))
    });

    let amount = amount.round();

    if amount < 0.0 {
        negative_fmt.fmt_string(amount.abs())
    } else if amount > 0.0 {
        positive_fmt.fmt_string(amount)
    } else {
        "0".to_owned()
    }
}
