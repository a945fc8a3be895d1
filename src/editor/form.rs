//! The transaction form shared by the create and edit pages.

use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};

use crate::{
    Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        loading_spinner,
    },
    ledger::{RecordFields, Transaction, TransactionKey, TransactionKind},
};

/// The page that opened the editor and that the client returns to afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnTo {
    /// The dashboard.
    #[default]
    Dashboard,
    /// The history page.
    History,
}

impl ReturnTo {
    /// The page to redirect to.
    pub fn endpoint(self) -> &'static str {
        match self {
            ReturnTo::Dashboard => endpoints::DASHBOARD_VIEW,
            ReturnTo::History => endpoints::HISTORY_VIEW,
        }
    }

    /// The value used in query strings and hidden inputs.
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnTo::Dashboard => "dashboard",
            ReturnTo::History => "history",
        }
    }
}

/// Whether the form creates a new row or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// Submit with POST to the transactions route.
    Create,
    /// Submit with PUT to the route for this transaction.
    Edit(TransactionKey),
}

/// The raw text entered in the transaction form.
///
/// Every field is kept as text so that invalid input can be shown back to
/// the user unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionForm {
    /// Income or expense. Ignored when editing, the key decides the kind.
    pub kind: TransactionKind,
    /// The date as YYYY-MM-DD.
    #[serde(default)]
    pub date: String,
    /// The funding source or spending category.
    #[serde(default)]
    pub category_label: String,
    /// The amount of money.
    #[serde(default)]
    pub amount: String,
    /// Optional free text.
    #[serde(default)]
    pub notes: String,
    /// Where to send the client after saving.
    #[serde(default)]
    pub return_to: ReturnTo,
}

impl TransactionForm {
    /// An empty form for a new transaction dated `today`.
    pub fn new(kind: TransactionKind, today: Date, return_to: ReturnTo) -> Self {
        Self {
            kind,
            date: today.to_string(),
            return_to,
            ..Default::default()
        }
    }

    /// A form filled in from a stored transaction.
    pub fn from_transaction(transaction: &Transaction, return_to: ReturnTo) -> Self {
        Self {
            kind: transaction.kind,
            date: transaction.date.to_string(),
            category_label: transaction.category_label.clone(),
            amount: format!("{:.2}", transaction.amount),
            notes: transaction.notes.clone().unwrap_or_default(),
            return_to,
        }
    }

    /// Check the form and convert it to the fields stored for `kind`.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: a missing or malformed date, a blank
    /// source or category, or a missing, non-numeric or negative amount.
    pub fn validate(&self, kind: TransactionKind) -> Result<RecordFields, Error> {
        let date = self.date.trim();
        if date.is_empty() {
            return Err(Error::MissingDate);
        }
        let date = Date::parse(date, format_description!("[year]-[month]-[day]"))
            .map_err(|_| Error::InvalidDate(date.to_owned()))?;

        let category_label = self.category_label.trim();
        if category_label.is_empty() {
            return Err(Error::MissingCategoryLabel(kind.label_name()));
        }

        let amount = self.amount.trim();
        if amount.is_empty() {
            return Err(Error::MissingAmount);
        }
        let amount = amount
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite())
            .ok_or_else(|| Error::InvalidAmount(amount.to_owned()))?;
        if amount < 0.0 {
            return Err(Error::NegativeAmount);
        }

        let notes = self.notes.trim();

        Ok(RecordFields {
            date,
            category_label: category_label.to_owned(),
            amount,
            notes: (!notes.is_empty()).then(|| notes.to_owned()),
        })
    }
}

/// Render the transaction form for `kind`.
///
/// The form swaps itself out with the response so that validation errors are
/// shown in place. `error_message` is shown above the fields.
pub fn transaction_form(
    kind: TransactionKind,
    mode: EditorMode,
    form: &TransactionForm,
    error_message: Option<&str>,
) -> Markup {
    let (hx_post, hx_put) = match mode {
        EditorMode::Create => (Some(endpoints::TRANSACTIONS_API.to_owned()), None),
        EditorMode::Edit(key) => (
            None,
            Some(endpoints::format_endpoint(endpoints::TRANSACTION, key)),
        ),
    };

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            @if let Some(message) = error_message {
                p class="text-sm text-red-600 dark:text-red-400" { (message) }
            }

            input type="hidden" name="kind" value=(kind.as_str());
            input type="hidden" name="return_to" value=(form.return_to.as_str());

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
                    value=(form.date)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label
                    for="category_label"
                    class=(FORM_LABEL_STYLE)
                {
                    (kind.label_name())
                }

                input
                    name="category_label"
                    id="category_label"
                    type="text"
                    placeholder=(kind.label_placeholder())
                    value=(form.category_label)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label
                    for="amount"
                    class=(FORM_LABEL_STYLE)
                {
                    "Amount"
                }

                // w-full needed to ensure input takes the full width when prefilled with a value
                div class="input-wrapper w-full"
                {
                    input
                        name="amount"
                        id="amount"
                        type="number"
                        step="0.01"
                        min="0"
                        placeholder="0.00"
                        value=(form.amount)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label
                    for="notes"
                    class=(FORM_LABEL_STYLE)
                {
                    "Notes"
                }

                textarea
                    name="notes"
                    id="notes"
                    rows="3"
                    placeholder="Notes (optional)"
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    (form.notes)
                }
            }

            div class="flex gap-4"
            {
                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span id="indicator" class="inline htmx-indicator"
                    {
                        (loading_spinner())
                    }
                    "Save"
                }

                a href=(form.return_to.endpoint()) class=(BUTTON_SECONDARY_STYLE)
                {
                    "Cancel"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};
    use time::macros::date;

    use crate::{
        Error, endpoints,
        ledger::{RecordFields, TransactionKey, TransactionKind},
        test_utils::{
            assert_form_error_message, assert_form_input, assert_form_input_with_value,
            assert_form_submit_button_with_text, assert_hx_endpoint, must_get_form,
        },
    };

    use super::{EditorMode, ReturnTo, TransactionForm, transaction_form};

    fn valid_form() -> TransactionForm {
        TransactionForm {
            kind: TransactionKind::Income,
            date: "2024-01-05".to_owned(),
            category_label: "  Donation ".to_owned(),
            amount: "500".to_owned(),
            notes: String::new(),
            return_to: ReturnTo::Dashboard,
        }
    }

    fn render(
        kind: TransactionKind,
        mode: EditorMode,
        form: &TransactionForm,
        error: Option<&str>,
    ) -> Html {
        Html::parse_fragment(&transaction_form(kind, mode, form, error).into_string())
    }

    #[test]
    fn validate_trims_label_and_drops_blank_notes() {
        let fields = valid_form().validate(TransactionKind::Income);

        assert_eq!(
            fields,
            Ok(RecordFields {
                date: date!(2024 - 01 - 05),
                category_label: "Donation".to_owned(),
                amount: 500.0,
                notes: None,
            })
        );
    }

    #[test]
    fn validate_keeps_notes() {
        let form = TransactionForm {
            notes: " Festival offering ".to_owned(),
            ..valid_form()
        };

        let fields = form.validate(TransactionKind::Income).unwrap();

        assert_eq!(fields.notes.as_deref(), Some("Festival offering"));
    }

    #[test]
    fn validate_rejects_missing_or_malformed_date() {
        let missing = TransactionForm {
            date: " ".to_owned(),
            ..valid_form()
        };
        let malformed = TransactionForm {
            date: "05/01/2024".to_owned(),
            ..valid_form()
        };

        assert_eq!(
            missing.validate(TransactionKind::Income),
            Err(Error::MissingDate)
        );
        assert_eq!(
            malformed.validate(TransactionKind::Income),
            Err(Error::InvalidDate("05/01/2024".to_owned()))
        );
    }

    #[test]
    fn validate_rejects_blank_label_with_kind_specific_name() {
        let form = TransactionForm {
            category_label: "   ".to_owned(),
            ..valid_form()
        };

        assert_eq!(
            form.validate(TransactionKind::Income),
            Err(Error::MissingCategoryLabel("Source"))
        );
        assert_eq!(
            form.validate(TransactionKind::Expense),
            Err(Error::MissingCategoryLabel("Category"))
        );
    }

    #[test]
    fn validate_rejects_bad_amounts() {
        let cases = [
            ("", Error::MissingAmount),
            ("abc", Error::InvalidAmount("abc".to_owned())),
            ("inf", Error::InvalidAmount("inf".to_owned())),
            ("NaN", Error::InvalidAmount("NaN".to_owned())),
            ("-1", Error::NegativeAmount),
        ];

        for (amount, want) in cases {
            let form = TransactionForm {
                amount: amount.to_owned(),
                ..valid_form()
            };

            assert_eq!(
                form.validate(TransactionKind::Income),
                Err(want),
                "amount {amount:?}"
            );
        }
    }

    #[test]
    fn validate_accepts_zero() {
        let form = TransactionForm {
            amount: "0".to_owned(),
            ..valid_form()
        };

        assert_eq!(form.validate(TransactionKind::Expense).unwrap().amount, 0.0);
    }

    #[test]
    fn create_form_posts_to_transactions() {
        let form = TransactionForm::new(
            TransactionKind::Expense,
            date!(2024 - 01 - 06),
            ReturnTo::History,
        );

        let html = render(TransactionKind::Expense, EditorMode::Create, &form, None);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_form_input_with_value(&form, "date", "date", "2024-01-06");
        assert_form_input(&form, "category_label", "text");
        assert_form_input(&form, "amount", "number");
        assert_form_submit_button_with_text(&form, "Save");

        let hidden = Selector::parse("input[type=hidden]").unwrap();
        let hidden_values = form
            .select(&hidden)
            .map(|input| {
                (
                    input.value().attr("name").unwrap_or_default(),
                    input.value().attr("value").unwrap_or_default(),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            hidden_values,
            [("kind", "expense"), ("return_to", "history")]
        );
    }

    #[test]
    fn edit_form_puts_to_transaction() {
        let key = TransactionKey {
            kind: TransactionKind::Income,
            id: 3,
        };

        let html = render(
            TransactionKind::Income,
            EditorMode::Edit(key),
            &valid_form(),
            None,
        );

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, "/api/transactions/income-3", "hx-put");
        assert!(form.value().attr("hx-post").is_none());
    }

    #[test]
    fn label_placeholder_depends_on_kind() {
        let cases = [
            (TransactionKind::Income, "Source (eg Donation)"),
            (TransactionKind::Expense, "Category (eg Maintenance)"),
        ];
        let selector = Selector::parse("input[name=category_label]").unwrap();

        for (kind, want) in cases {
            let html = render(kind, EditorMode::Create, &valid_form(), None);

            let input = html.select(&selector).next().expect("No category input");
            assert_eq!(input.value().attr("placeholder"), Some(want));
        }
    }

    #[test]
    fn notes_and_amount_fields() {
        let html = render(
            TransactionKind::Income,
            EditorMode::Create,
            &valid_form(),
            None,
        );

        let notes = html
            .select(&Selector::parse("textarea[name=notes]").unwrap())
            .next()
            .expect("No notes textarea");
        assert_eq!(notes.value().attr("placeholder"), Some("Notes (optional)"));
        assert!(notes.value().attr("required").is_none());

        let amount = html
            .select(&Selector::parse("input[name=amount]").unwrap())
            .next()
            .expect("No amount input");
        assert_eq!(amount.value().attr("step"), Some("0.01"));
    }

    #[test]
    fn error_message_is_shown_with_input_kept() {
        let form = TransactionForm {
            amount: "abc".to_owned(),
            ..valid_form()
        };

        let html = render(
            TransactionKind::Income,
            EditorMode::Create,
            &form,
            Some("\"abc\" is not a valid amount."),
        );

        let form = must_get_form(&html);
        assert_form_error_message(&form, "\"abc\" is not a valid amount.");
        assert_form_input_with_value(&form, "category_label", "text", "  Donation ");
    }

    #[test]
    fn cancel_returns_to_opener() {
        let form = TransactionForm {
            return_to: ReturnTo::History,
            ..valid_form()
        };

        let html = render(TransactionKind::Income, EditorMode::Create, &form, None);

        let cancel = html
            .select(&Selector::parse("a").unwrap())
            .next()
            .expect("No cancel link");
        assert_eq!(cancel.value().attr("href"), Some(endpoints::HISTORY_VIEW));
    }
}
