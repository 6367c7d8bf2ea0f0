use std::rc::Rc;

use budget_uploader_lib::{
    backend::{Backend, HttpBackend, StatementFile},
    config::{Config, DEFAULT_BACKEND_URL},
    filter::{available_years, FilterState, Month, MonthFilter, YearFilter, ALL},
    presenter::{Row, Summary},
    session::Session,
};
use dioxus::prelude::*;
use strum::IntoEnumIterator;
use tracing::{info, warn, Level};

fn main() {
    dioxus_logger::init(Level::INFO).expect("failed to init logger");

    #[cfg(feature = "desktop")]
    {
        let cfg = dioxus::desktop::Config::new()
            .with_custom_head(r#"<link rel="stylesheet" href="assets/tailwind.css">"#.to_string());
        LaunchBuilder::desktop().with_cfg(cfg).launch(App)
    }

    #[cfg(feature = "web")]
    LaunchBuilder::web().launch(App)
}

/// Backend url, overridable at build time
fn config() -> Config {
    Config {
        backend_url: option_env!("BUDGET_UPLOADER_BACKEND_URL")
            .unwrap_or(DEFAULT_BACKEND_URL)
            .into(),
        ..Config::default()
    }
}

#[component]
fn App() -> Element {
    let mut session = use_signal(|| Session::new(config()));
    let backend = use_hook(|| Rc::new(HttpBackend::new(&session.peek().config().backend_url)));

    let _memory = use_future({
        let backend = backend.clone();
        move || {
            let backend = backend.clone();
            async move {
                info!("budget-uploader {}", backend.base_url());
                let result = backend.get_categories().await;
                session.write().finish_memory_load(result);
            }
        }
    });

    let upload = {
        let backend = backend.clone();
        move |_: MouseEvent| {
            // A missing file sets the validation message on the session
            let Ok(ticket) = session.write().begin_upload() else {
                return;
            };
            let backend = backend.clone();
            spawn(async move {
                let result = backend.upload_pdf(&ticket.file).await;
                session.write().finish_upload(ticket.attempt, result);
            });
        }
    };

    let change_category = {
        let backend = backend.clone();
        move |(description, category): (String, String)| {
            let ticket = match session.write().begin_category_change(&description, &category) {
                Ok(ticket) => ticket,
                Err(e) => {
                    warn!("{}", e);
                    return;
                }
            };
            let backend = backend.clone();
            spawn(async move {
                let result = backend
                    .save_category(&ticket.description, &ticket.category)
                    .await;
                if let Err(e) = session.write().finish_save(&ticket, result) {
                    warn!("{}", e);
                }
            });
        }
    };

    let state = session.read();
    let loading = state.upload().is_loading();
    let upload_error = state.upload().error().map(str::to_string);
    let save_error = state.save_error().map(str::to_string);
    let filter = state.filter();
    let years = available_years(state.transactions());
    let has_transactions = !state.transactions().is_empty();
    let rows = state.view().rows.clone();
    let summary = state.view().summary();
    let categories = state.config().categories.clone();
    drop(state);

    rsx! {
        div { class: "max-w-screen-lg mx-auto px-4",
            h1 { class: "font-mono text-lg", "Budget Uploader" }
            div { class: "py-2",
                input {
                    r#type: "file",
                    accept: ".pdf",
                    onchange: move |evt: FormEvent| async move {
                        let mut selected = None;
                        if let Some(engine) = evt.files() {
                            if let Some(name) = engine.files().into_iter().next() {
                                if let Some(bytes) = engine.read_file(&name).await {
                                    selected = Some(StatementFile::new(name, bytes));
                                }
                            }
                        }
                        session.write().select_file(selected);
                    },
                }
                button { class: "font-mono text-sm px-2", disabled: loading, onclick: upload,
                    if loading { "Uploading..." } else { "Upload PDF" }
                }
            }
            if let Some(error) = upload_error {
                p { class: "font-mono text-sm text-red-600", "{error}" }
            }
            if let Some(error) = save_error {
                p { class: "font-mono text-sm text-red-600", "{error}" }
            }
            if has_transactions {
                Filters { filter, years, on_change: move |filter: FilterState| session.write().set_filter(filter) }
                SummaryLine { summary }
                TransactionTable { rows, categories, on_select: change_category }
            }
        }
    }
}

#[component]
fn Filters(filter: FilterState, years: Vec<i32>, on_change: EventHandler<FilterState>) -> Element {
    let months = Month::iter()
        .map(|m| (m.to_string(), m.name()))
        .collect::<Vec<_>>();
    let month = filter.month.to_string();
    let year = filter.year.to_string();

    rsx!(
        div { class: "py-2",
            select {
                class: "font-mono text-sm px-1",
                value: "{month}",
                onchange: move |evt: FormEvent| {
                    match evt.value().parse::<MonthFilter>() {
                        Ok(month) => on_change.call(FilterState { month, ..filter }),
                        Err(e) => warn!("{}", e),
                    }
                },
                option { value: ALL, "All months" }
                for (code, name) in months {
                    option { value: "{code}", "{name}" }
                }
            }
            select {
                class: "font-mono text-sm px-1",
                value: "{year}",
                onchange: move |evt: FormEvent| {
                    match evt.value().parse::<YearFilter>() {
                        Ok(year) => on_change.call(FilterState { year, ..filter }),
                        Err(e) => warn!("{}", e),
                    }
                },
                option { value: ALL, "All years" }
                for year in years {
                    option { value: "{year}", "{year}" }
                }
            }
        }
    )
}

#[component]
fn SummaryLine(summary: Summary) -> Element {
    let Summary {
        visible,
        categorized,
        uncategorized,
    } = summary;
    rsx!(
        p { class: "font-mono text-sm",
            "{visible} transactions, {categorized} categorized, {uncategorized} uncategorized"
        }
    )
}

#[component]
fn TransactionTable(
    rows: Vec<Row>,
    categories: Vec<String>,
    on_select: EventHandler<(String, String)>,
) -> Element {
    rsx!(
        table { class: "w-full mt-4",
            thead {
                tr {
                    th { class: "font-mono text-sm text-left", "Date" }
                    th { class: "font-mono text-sm text-left", "Transaction" }
                    th { class: "font-mono text-sm text-left", "Category" }
                }
            }
            tbody {
                for row in rows {
                    TransactionRow {
                        key: "{row.index}",
                        row,
                        categories: categories.clone(),
                        on_select,
                    }
                }
            }
        }
    )
}

#[component]
fn TransactionRow(
    row: Row,
    categories: Vec<String>,
    on_select: EventHandler<(String, String)>,
) -> Element {
    let Row {
        transaction,
        category,
        ..
    } = row;
    let date = transaction
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let description = transaction.description;
    let selected = description.clone();
    let line = transaction.original_line.to_string();

    rsx!(
        tr {
            td { class: "font-mono text-sm px-1", "{date}" }
            td { class: "font-mono text-xs px-1", title: "{line}", "{description}" }
            td {
                select {
                    class: "font-mono text-sm px-1",
                    value: "{category}",
                    onchange: move |evt: FormEvent| on_select.call((selected.clone(), evt.value())),
                    option { value: "", "Uncategorized" }
                    for label in categories {
                        option { value: "{label}", "{label}" }
                    }
                }
            }
        }
    )
}
