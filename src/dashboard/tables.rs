//! The recent transactions table on the dashboard.

use maud::{Markup, html};

use crate::{
    html::{
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, amount_color_class, format_currency,
    },
    ledger::Transaction,
};

/// Renders the most recent transactions, or a message when there are none.
pub(super) fn recent_transactions_view(transactions: &[Transaction]) -> Markup {
    html! {
        section id="recent-transactions" class="w-full mb-8"
        {
            h3 class="text-xl font-semibold mb-4" { "Recent Transactions" }

            @if transactions.is_empty() {
                p class="text-gray-600 dark:text-gray-400" { "No recent transactions" }
            } @else {
                div class="overflow-x-auto rounded-lg shadow"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                            }
                        }

                        tbody
                        {
                            @for transaction in transactions {
                                tr class=(TABLE_ROW_STYLE) data-transaction-key=(transaction.key())
                                {
                                    td class={(TABLE_CELL_STYLE) " whitespace-nowrap"} { (transaction.date) }
                                    td class=(TABLE_CELL_STYLE) { (transaction.kind.title()) }
                                    td class=(TABLE_CELL_STYLE) { (transaction.category_label) }
                                    td class={(TABLE_CELL_STYLE) " text-right whitespace-nowrap " (amount_color_class(transaction.kind))}
                                    {
                                        (format_currency(transaction.amount))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
