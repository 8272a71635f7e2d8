//! HTML form scraping for the login and consumption-history pages.
//!
//! The portal is a Drupal site: every form carries hidden build tokens that
//! must be echoed back on submission, so the defaults are scraped from the
//! live page and resubmitted with our own values layered on top.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::Error;

/// `id` of the login form on `/user/login`.
pub const LOGIN_FORM_ID: &str = "user-login-form";
/// `id` of the consumption history form on `/consumption`.
pub const CONSUMPTION_FORM_ID: &str = "eso-consumption-history-form";

/// Field name → value pairs of an HTML form, ready to be submitted as
/// `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormFields(BTreeMap<String, String>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encodes the fields as a urlencoded request body.
    pub fn to_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

/// One `<option>` of a `<select>` control in the consumption form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// The parsed consumption form: the chosen object and the base payload.
#[derive(Debug, Clone)]
pub struct ConsumptionForm {
    pub selector: String,
    pub fields: FormFields,
}

fn selector(css: &str) -> Result<Selector, Error> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("invalid selector `{}`: {:?}", css, e)))
}

fn find_form<'a>(document: &'a Html, form_id: &str) -> Result<ElementRef<'a>, Error> {
    let form_selector = selector(&format!("form[id=\"{}\"]", form_id))?;
    document
        .select(&form_selector)
        .next()
        .ok_or_else(|| Error::FormNotFound {
            form_id: form_id.to_string(),
        })
}

fn input_defaults(form: ElementRef<'_>) -> Result<FormFields, Error> {
    let inputs = selector("input")?;
    let mut fields = FormFields::new();
    for input in form.select(&inputs) {
        let element = input.value();
        if let Some(name) = element.attr("name").filter(|n| !n.is_empty()) {
            fields.insert(name, element.attr("value").unwrap_or_default());
        }
    }
    Ok(fields)
}

/// Scrapes the default fields of the login form.
pub fn login_fields(html: &str) -> Result<FormFields, Error> {
    let document = Html::parse_document(html);
    let form = find_form(&document, LOGIN_FORM_ID)?;
    input_defaults(form)
}

fn consumption_defaults(form: ElementRef<'_>) -> Result<FormFields, Error> {
    let mut fields = input_defaults(form)?;

    // Text and hidden inputs win only when they carry a value.
    let typed = selector("input[type=\"text\"], input[type=\"hidden\"]")?;
    for input in form.select(&typed) {
        let element = input.value();
        let name = element.attr("name").filter(|n| !n.is_empty());
        let value = element.attr("value").filter(|v| !v.is_empty());
        if let (Some(name), Some(value)) = (name, value) {
            fields.insert(name, value);
        }
    }
    Ok(fields)
}

/// Scrapes the default fields of the consumption history form.
pub fn consumption_fields(html: &str) -> Result<FormFields, Error> {
    let document = Html::parse_document(html);
    let form = find_form(&document, CONSUMPTION_FORM_ID)?;
    consumption_defaults(form)
}

fn select_options(form: ElementRef<'_>) -> Result<Vec<SelectOption>, Error> {
    let options = selector("select option")?;
    Ok(form
        .select(&options)
        .map(|option| {
            let text = option.text().collect::<String>().trim().to_string();
            let value = option
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| text.clone());
            SelectOption { value, text }
        })
        .collect())
}

/// Lists every selectable object in the consumption form.
pub fn list_options(html: &str) -> Result<Vec<SelectOption>, Error> {
    let document = Html::parse_document(html);
    let form = find_form(&document, CONSUMPTION_FORM_ID)?;
    select_options(form)
}

fn pick_option(display_name: &str, options: &[SelectOption]) -> Result<String, Error> {
    let exact: Vec<&SelectOption> = options.iter().filter(|o| o.text == display_name).collect();
    let candidates = if exact.is_empty() {
        options
            .iter()
            .filter(|o| o.text.contains(display_name))
            .collect()
    } else {
        exact
    };

    let mut distinct: Vec<&SelectOption> = Vec::new();
    for option in candidates {
        if !distinct.iter().any(|d| d.value == option.value) {
            distinct.push(option);
        }
    }

    match distinct.as_slice() {
        [] => Err(Error::SelectorNotFound {
            display_name: display_name.to_string(),
        }),
        [only] => Ok(only.value.clone()),
        many => Err(Error::AmbiguousSelector {
            display_name: display_name.to_string(),
            candidates: many.iter().map(|o| o.text.clone()).collect(),
        }),
    }
}

/// Finds the option value of the object whose visible text matches
/// `display_name`.
///
/// An exact (trimmed) text match is preferred; otherwise any option whose
/// text contains `display_name` is considered. More than one distinct value
/// in the winning group is reported as [`Error::AmbiguousSelector`].
pub fn locate_selector(html: &str, display_name: &str) -> Result<String, Error> {
    let options = list_options(html)?;
    pick_option(display_name.trim(), &options)
}

/// Parses the consumption page once, returning the chosen object together
/// with the form defaults.
pub fn parse_consumption_form(html: &str, display_name: &str) -> Result<ConsumptionForm, Error> {
    let document = Html::parse_document(html);
    let form = find_form(&document, CONSUMPTION_FORM_ID)?;
    let options = select_options(form)?;
    let selector = pick_option(display_name.trim(), &options)?;
    let fields = consumption_defaults(form)?;
    Ok(ConsumptionForm { selector, fields })
}
