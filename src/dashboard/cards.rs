//! The summary cards at the top of the dashboard.

use maud::{Markup, html};

use crate::{
    html::{CARD_STYLE, format_currency},
    ledger::Summary,
};

const INCOME_STYLE: &str = "text-green-600 dark:text-green-400";
const EXPENSE_STYLE: &str = "text-red-600 dark:text-red-400";

/// The colour for a balance: green when nothing is owed, red otherwise.
fn balance_color_class(balance: f64) -> &'static str {
    if balance >= 0.0 {
        INCOME_STYLE
    } else {
        EXPENSE_STYLE
    }
}

fn summary_card(title: &str, amount: f64, color_class: &str) -> Markup {
    html! {
        div class=(CARD_STYLE) aria-label=(format!("{title}: {}", format_currency(amount)))
        {
            h3 class="text-sm font-medium text-gray-600 dark:text-gray-400 mb-2" { (title) }

            div class={"text-2xl font-bold " (color_class)}
            {
                (format_currency(amount))
            }
        }
    }
}

/// Renders the total income, total expenses and balance cards.
pub(super) fn summary_cards_view(summary: &Summary) -> Markup {
    html! {
        section id="summary-cards" class="w-full grid grid-cols-1 md:grid-cols-3 gap-4 mb-4"
        {
            (summary_card("Total Income", summary.total_income, INCOME_STYLE))
            (summary_card("Total Expenses", summary.total_expenses, EXPENSE_STYLE))
            (summary_card("Balance", summary.balance, balance_color_class(summary.balance)))
        }
    }
}
