//! The filter and new transaction forms on the dashboard.

use maud::{Markup, html};

use crate::{
    dashboard::filter::{FilterForm, FraudStatus},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, loading_spinner,
    },
};

const FRAUD_STATUS_OPTIONS: [(FraudStatus, &str, &str); 3] = [
    (FraudStatus::All, "all", "All Transactions"),
    (FraudStatus::Fraud, "fraud", "Fraudulent Only"),
    (FraudStatus::Legitimate, "legitimate", "Legitimate Only"),
];

fn text_input(name: &str, label: &str, input_type: &str, value: &str) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }
            input
                id=(name)
                name=(name)
                type=(input_type)
                value=(value)
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

/// Renders the filter form, pre-filled with the active filter values.
///
/// The form submits a GET request so the filters are kept in the query string.
pub(super) fn filter_form_view(form: &FilterForm) -> Markup {
    html! {
        form
            id="filter-form"
            method="get"
            action=(endpoints::DASHBOARD_VIEW)
            class={ (CARD_STYLE) " w-full mb-6 space-y-4" }
        {
            h3 class="text-lg font-semibold" { "Filters" }

            div class="grid grid-cols-1 md:grid-cols-2 lg:grid-cols-4 gap-4"
            {
                div class="lg:col-span-2"
                {
                    label for="search" class=(FORM_LABEL_STYLE) { "Search" }
                    input
                        id="search"
                        name="search"
                        type="search"
                        placeholder="Search transactions..."
                        value=(form.search)
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                (text_input("from", "From", "date", &form.from))
                (text_input("to", "To", "date", &form.to))
                (text_input("min", "Min Amount", "number", &form.min))
                (text_input("max", "Max Amount", "number", &form.max))
                (text_input("location", "Location", "text", &form.location))
                (text_input("device", "Device", "text", &form.device))

                div
                {
                    label for="fraud_status" class=(FORM_LABEL_STYLE) { "Status" }
                    select id="fraud_status" name="fraud_status" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for (status, value, label) in FRAUD_STATUS_OPTIONS {
                            option value=(value) selected[form.fraud_status == status] { (label) }
                        }
                    }
                }
            }

            div class="flex gap-4"
            {
                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Apply Filters" }
                a href=(endpoints::DASHBOARD_VIEW) class=(BUTTON_SECONDARY_STYLE) { "Clear" }
            }
        }
    }
}

/// Renders the form for submitting a single transaction to the scoring API.
pub(super) fn new_transaction_form_view() -> Markup {
    let spinner = loading_spinner();

    html! {
        div class=(CARD_STYLE)
        {
            h3 class="text-lg font-semibold mb-4" { "New Transaction" }

            form
                id="new-transaction-form"
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-disabled-elt="#new-transaction-form button"
                hx-indicator="#new-transaction-indicator"
                hx-target="#alert-container"
                hx-target-error="#alert-container"
                hx-swap="innerHTML"
                class="space-y-4"
            {
                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                    input
                        id="amount"
                        name="amount"
                        type="number"
                        step="0.01"
                        placeholder="Amount"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="new-location" class=(FORM_LABEL_STYLE) { "Location" }
                    input
                        id="new-location"
                        name="location"
                        type="text"
                        placeholder="Location"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="new-device" class=(FORM_LABEL_STYLE) { "Device" }
                    input
                        id="new-device"
                        name="device"
                        type="text"
                        placeholder="Device"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE)
                {
                    span class="inline htmx-indicator" id="new-transaction-indicator" { (spinner) }
                    " Process Transaction"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use crate::{
        dashboard::filter::{FilterForm, FraudStatus},
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            must_get_form,
        },
    };

    use super::{filter_form_view, new_transaction_form_view};

    #[test]
    fn filter_form_keeps_active_values() {
        let form = FilterForm {
            search: "auck".to_owned(),
            min: "10".to_owned(),
            fraud_status: FraudStatus::Fraud,
            ..Default::default()
        };

        let html = Html::parse_fragment(&filter_form_view(&form).into_string());

        assert_valid_html(&html);
        let form = must_get_form(&html, "#filter-form");
        assert_eq!(form.value().attr("method"), Some("get"));
        assert_eq!(form.value().attr("action"), Some(endpoints::DASHBOARD_VIEW));
        assert_form_input(&form, "from", "date", false);
        assert_form_input(&form, "max", "number", false);

        let search = form
            .select(&Selector::parse("input[name=search]").unwrap())
            .next()
            .unwrap();
        assert_eq!(search.value().attr("value"), Some("auck"));

        let selected = form
            .select(&Selector::parse("option[selected]").unwrap())
            .next()
            .unwrap();
        assert_eq!(selected.value().attr("value"), Some("fraud"));
    }

    #[test]
    fn new_transaction_form_posts_to_api() {
        let html = Html::parse_fragment(&new_transaction_form_view().into_string());

        assert_valid_html(&html);
        let form = must_get_form(&html, "#new-transaction-form");
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_form_input(&form, "amount", "number", true);
        assert_form_input(&form, "location", "text", true);
        assert_form_input(&form, "device", "text", true);
        assert_form_submit_button(&form);
    }
}
