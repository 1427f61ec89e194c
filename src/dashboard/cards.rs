//! Statistic cards shown at the top of the dashboard.

use maud::{Markup, html};

use crate::{
    dashboard::aggregation::SummaryStats,
    html::{CARD_STYLE, format_currency},
};

/// Renders the headline statistics as a grid of cards.
pub(super) fn summary_cards_view(stats: &SummaryStats) -> Markup {
    html! {
        section id="summary-cards" class="w-full mx-auto mb-6"
        {
            div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4"
            {
                (stat_card("Total Transactions", &stats.total_transactions.to_string(), None))
                (stat_card(
                    "Total Amount",
                    &format_currency(stats.total_amount),
                    Some(&format!("{} flagged as fraud", format_currency(stats.fraud_amount))),
                ))
                (stat_card(
                    "Fraud Rate",
                    &format!("{:.1}%", stats.fraud_rate),
                    Some(&format!("{} fraudulent transactions", stats.fraud_count)),
                ))
                (stat_card("Average Amount", &format_currency(stats.average_amount), None))
            }
        }
    }
}

fn stat_card(title: &str, value: &str, caption: Option<&str>) -> Markup {
    html! {
        div class=(CARD_STYLE) data-stat=(title)
        {
            h4 class="text-sm font-medium text-gray-600 dark:text-gray-400" { (title) }
            p class="text-2xl font-bold" { (value) }

            @if let Some(caption) = caption {
                p class="text-xs text-gray-500 dark:text-gray-400" { (caption) }
            }
        }
    }
}

/// Renders the fraudulent and legitimate transaction counts.
pub(super) fn fraud_breakdown_view(stats: &SummaryStats) -> Markup {
    html! {
        div id="fraud-breakdown" class=(CARD_STYLE)
        {
            h3 class="text-lg font-semibold mb-4" { "Statistics" }

            dl class="space-y-4"
            {
                div class="flex justify-between items-center"
                {
                    dt { "Total Transactions:" }
                    dd class="font-bold" { (stats.total_transactions) }
                }
                div class="flex justify-between items-center"
                {
                    dt { "Fraudulent Transactions:" }
                    dd class="font-bold text-red-500" { (stats.fraud_count) }
                }
                div class="flex justify-between items-center"
                {
                    dt { "Legitimate Transactions:" }
                    dd class="font-bold text-green-500" { (stats.legitimate_count()) }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use crate::{
        dashboard::aggregation::summarize,
        test_utils::{assert_valid_html, must_select, text_of},
        transaction::test_utils::{fraudulent, transaction},
    };

    use super::{fraud_breakdown_view, summary_cards_view};

    #[test]
    fn cards_show_summary_statistics() {
        let stats = summarize(&[
            transaction(1, 100.0),
            transaction(2, 50.0),
            transaction(3, 25.0),
            fraudulent(4, 25.0),
        ]);

        let html = Html::parse_fragment(&summary_cards_view(&stats).into_string());

        assert_valid_html(&html);
        assert!(text_of(must_select(&html, "[data-stat='Total Transactions']")).contains('4'));
        assert!(text_of(must_select(&html, "[data-stat='Total Amount']")).contains("$200.00"));
        assert!(text_of(must_select(&html, "[data-stat='Fraud Rate']")).contains("25.0%"));
        assert!(text_of(must_select(&html, "[data-stat='Average Amount']")).contains("$50.00"));
    }

    #[test]
    fn breakdown_counts_legitimate_transactions() {
        let stats = summarize(&[transaction(1, 1.0), fraudulent(2, 1.0), fraudulent(3, 1.0)]);

        let html = Html::parse_fragment(&fraud_breakdown_view(&stats).into_string());

        let text = text_of(must_select(&html, "#fraud-breakdown"));
        assert!(text.contains("Fraudulent Transactions:"));
        assert!(text.contains("Legitimate Transactions:"));
        let values: Vec<String> = html
            .select(&scraper::Selector::parse("dd").unwrap())
            .map(text_of)
            .collect();
        assert_eq!(values, vec!["3", "2", "1"]);
    }
}
