//! The page listing every transaction with filter and sort controls.

use axum::{
    extract::Query,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    changes::{LEDGER_CHANGED_EVENT, changes_poller},
    editor::ReturnTo,
    endpoints,
    history::table::HistoryQuery,
    html::{
        BUTTON_EXPENSE_STYLE, BUTTON_INCOME_STYLE, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE,
        FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        base, loading_spinner,
    },
    ledger::{SortOrder, TransactionFilter, TransactionKind},
    navigation::NavBar,
};

fn new_transaction_url(kind: TransactionKind) -> String {
    format!(
        "{}?kind={}&return_to={}",
        endpoints::NEW_TRANSACTION_VIEW,
        kind.as_str(),
        ReturnTo::History.as_str()
    )
}

fn history_controls(query: HistoryQuery) -> Markup {
    html! {
        form id="history-controls" class="w-full flex flex-wrap items-end gap-4 mb-4"
        {
            fieldset class="flex-1 min-w-64"
            {
                legend class=(FORM_LABEL_STYLE) { "Show" }

                div class=(FORM_RADIO_GROUP_STYLE)
                {
                    @for filter in TransactionFilter::OPTIONS {
                        @let id = format!("filter-{}", filter.as_str());

                        div class="flex flex-1 items-center"
                        {
                            input
                                type="radio"
                                id=(id)
                                name="filter"
                                value=(filter.as_str())
                                checked[filter == query.filter]
                                class={(FORM_RADIO_INPUT_STYLE) " sr-only"};

                            label for=(id) class={(FORM_RADIO_LABEL_STYLE) " text-center"}
                            {
                                (filter.label())
                            }
                        }
                    }
                }
            }

            div class="min-w-48"
            {
                label for="sort" class=(FORM_LABEL_STYLE) { "Sort by" }

                select id="sort" name="sort" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for order in SortOrder::OPTIONS {
                        option value=(order.as_str()) selected[order == query.sort]
                        {
                            (order.label())
                        }
                    }
                }
            }

            span id="indicator" class="inline htmx-indicator py-2"
            {
                (loading_spinner())
                "Loading..."
            }
        }
    }
}

fn history_view(query: HistoryQuery) -> Markup {
    let nav_bar = NavBar::new(endpoints::HISTORY_VIEW).into_html();

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-xl"
            {
                div class="flex justify-between flex-wrap items-end gap-4 mb-4"
                {
                    h1 class="text-xl font-bold" { "Transaction History" }

                    div class="flex gap-4"
                    {
                        a href=(new_transaction_url(TransactionKind::Income)) class=(BUTTON_INCOME_STYLE)
                        {
                            "Add Income"
                        }

                        a href=(new_transaction_url(TransactionKind::Expense)) class=(BUTTON_EXPENSE_STYLE)
                        {
                            "Add Expense"
                        }
                    }
                }

                (history_controls(query))

                div
                    id="history-table"
                    hx-get=(endpoints::HISTORY_TABLE)
                    hx-trigger={
                        "load, " (LEDGER_CHANGED_EVENT) " from:body, change from:#history-controls"
                    }
                    hx-include="#history-controls"
                    hx-indicator="#indicator"
                    hx-swap="innerHTML"
                    hx-target-error="#alert-container"
                {}
            }
        }

        (changes_poller())
    );

    base("History", &[], &content)
}

/// Display the history page. The table itself is loaded as a fragment.
pub async fn get_history_page(Query(query): Query<HistoryQuery>) -> Response {
    history_view(query).into_response()
}

#[cfg(test)]
mod tests {
    use axum::{extract::Query, http::StatusCode};
    use scraper::Selector;

    use crate::{
        endpoints,
        history::table::HistoryQuery,
        ledger::{SortOrder, TransactionFilter},
        test_utils::{assert_valid_html, parse_html_document},
    };

    use super::get_history_page;

    #[tokio::test]
    async fn page_loads_table_with_controls() {
        let response = get_history_page(Query(HistoryQuery::default())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let table = document
            .select(&Selector::parse("#history-table").unwrap())
            .next()
            .expect("No history table container");
        assert_eq!(table.value().attr("hx-get"), Some(endpoints::HISTORY_TABLE));
        assert_eq!(table.value().attr("hx-include"), Some("#history-controls"));
        let trigger = table.value().attr("hx-trigger").unwrap_or_default();
        assert!(
            trigger.contains("ledger-changed from:body"),
            "got {trigger}"
        );
        assert!(
            trigger.contains("change from:#history-controls"),
            "got {trigger}"
        );

        let filters = document
            .select(&Selector::parse("input[name=filter]").unwrap())
            .map(|input| input.value().attr("value").unwrap_or_default().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(filters, ["all", "income", "expense"]);

        let sort_options = document
            .select(&Selector::parse("select[name=sort] option").unwrap())
            .count();
        assert_eq!(sort_options, SortOrder::OPTIONS.len());

        assert!(
            document
                .select(&Selector::parse("#indicator").unwrap())
                .next()
                .is_some()
        );
        assert!(
            document
                .select(&Selector::parse("#changes-poller").unwrap())
                .next()
                .is_some()
        );
    }

    #[tokio::test]
    async fn page_selects_query_options() {
        let response = get_history_page(Query(HistoryQuery {
            filter: TransactionFilter::Expense,
            sort: SortOrder::AmountAscending,
        }))
        .await;

        let document = parse_html_document(response).await;
        let checked = document
            .select(&Selector::parse("input[name=filter][checked]").unwrap())
            .map(|input| input.value().attr("value").unwrap_or_default().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(checked, ["expense"]);
        let selected = document
            .select(&Selector::parse("option[selected]").unwrap())
            .map(|option| option.value().attr("value").unwrap_or_default().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(selected, ["amount_ascending"]);
    }

    #[tokio::test]
    async fn add_buttons_return_to_history() {
        let response = get_history_page(Query(HistoryQuery::default())).await;

        let document = parse_html_document(response).await;
        let links = document
            .select(&Selector::parse("a[href^='/transactions/new']").unwrap())
            .map(|link| link.value().attr("href").unwrap_or_default().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            links,
            [
                "/transactions/new?kind=income&return_to=history",
                "/transactions/new?kind=expense&return_to=history"
            ]
        );
    }
}
