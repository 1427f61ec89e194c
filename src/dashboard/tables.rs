//! The transaction table on the dashboard.

use maud::{Markup, html};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    endpoints::{self, format_endpoint},
    html::{
        FRAUD_BADGE_STYLE, LEGITIMATE_BADGE_STYLE, LINK_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_currency, format_score,
    },
    transaction::Transaction,
};

const DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Renders the fraud status of a transaction as a badge.
pub(super) fn status_badge(is_fraud: bool) -> Markup {
    if is_fraud {
        html! { span class=(FRAUD_BADGE_STYLE) { "Fraudulent" } }
    } else {
        html! { span class=(LEGITIMATE_BADGE_STYLE) { "Legitimate" } }
    }
}

/// Renders `transactions` as a table, each row linking to the transaction's detail page.
///
/// `total` is the number of transactions before filtering.
pub(super) fn transactions_table(
    transactions: &[Transaction],
    total: usize,
    local_offset: UtcOffset,
) -> Markup {
    html! {
        section id="transactions" class="w-full mb-6"
        {
            div class="flex justify-between items-baseline mb-4"
            {
                h3 class="text-xl font-semibold" { "Recent Transactions" }
                span class="text-sm text-gray-600 dark:text-gray-400"
                {
                    "Showing " (transactions.len()) " of " (total)
                }
            }

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Time" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Location" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Device" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Score" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                        }
                    }

                    tbody
                    {
                        @for transaction in transactions {
                            (transaction_row(transaction, local_offset))
                        }

                        @if transactions.is_empty() {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td colspan="6" class={ (TABLE_CELL_STYLE) " text-center" }
                                {
                                    "No transactions match the current filters."
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn transaction_row(transaction: &Transaction, local_offset: UtcOffset) -> Markup {
    let detail_url = format_endpoint(endpoints::TRANSACTION_VIEW, transaction.id);
    let time = transaction
        .time
        .to_offset(local_offset)
        .format(DATE_TIME_FORMAT)
        .unwrap_or_default();

    html! {
        tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id.as_i64())
        {
            td class=(TABLE_CELL_STYLE)
            {
                a href=(detail_url) class=(LINK_STYLE) { (time) }
            }
            td class=(TABLE_CELL_STYLE) { (format_currency(transaction.amount)) }
            td class=(TABLE_CELL_STYLE) { (transaction.location) }
            td class=(TABLE_CELL_STYLE) { (transaction.device) }
            td class=(TABLE_CELL_STYLE) { (format_score(transaction.anomaly_score)) }
            td class=(TABLE_CELL_STYLE) { (status_badge(transaction.is_fraud)) }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};
    use time::macros::{datetime, offset};

    use crate::{
        test_utils::{assert_valid_html, must_select, text_of},
        transaction::test_utils::{at, fraudulent, transaction},
    };

    use super::transactions_table;

    #[test]
    fn rows_link_to_detail_page() {
        let transactions = vec![
            at(transaction(3, 12.5), datetime!(2024-03-01 23:30 UTC)),
            fraudulent(8, 990.0),
        ];

        let html = Html::parse_fragment(
            &transactions_table(&transactions, 5, offset!(+13)).into_string(),
        );

        assert_valid_html(&html);
        let rows: Vec<_> = html
            .select(&Selector::parse("tbody tr").unwrap())
            .collect();
        assert_eq!(rows.len(), 2);

        let link = rows[0]
            .select(&Selector::parse("a").unwrap())
            .next()
            .unwrap();
        assert_eq!(link.value().attr("href"), Some("/transactions/3"));
        assert_eq!(text_of(link), "2024-03-02 12:30");
        assert!(text_of(rows[1]).contains("Fraudulent"));
        assert!(text_of(must_select(&html, "#transactions")).contains("Showing 2 of 5"));
    }

    #[test]
    fn empty_table_shows_placeholder() {
        let html = Html::parse_fragment(&transactions_table(&[], 0, offset!(UTC)).into_string());

        assert!(html.html().contains("No transactions match the current filters."));
    }
}
