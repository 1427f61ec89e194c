#![allow(missing_docs)]

pub(crate) mod api;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use api::{FAKE_FRAUD_THRESHOLD, FakeApi, new_transaction};
pub(crate) use form::{assert_form_input, assert_form_submit_button, assert_hx_endpoint, must_get_form};
pub(crate) use html::{
    assert_valid_html, must_select, parse_html_document, parse_html_fragment, text_of,
};
pub(crate) use http::{assert_content_type, assert_status_ok};
