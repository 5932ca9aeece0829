use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use retail_dash::data::segment::CustomerSegment;

use crate::state::AppState;

/// Cap on product checkboxes drawn at once; the search box narrows the rest.
const MAX_PRODUCT_ROWS: usize = 200;

/// Clicks collected while drawing, applied once the panel is done.
enum Action {
    ToggleCountry(String),
    ToggleProduct(String),
    AllCountries,
    ClearCountries,
    ClearProducts,
    Segment(CustomerSegment),
    Reset,
    Export,
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🔍 Filters");
    ui.separator();

    let Some(table) = state.table.clone() else {
        ui.label("No dataset loaded.");
        return;
    };
    let Some(bounds) = table.bounds else {
        ui.label("The dataset is empty.");
        return;
    };

    let mut changed = false;
    let mut actions = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Date range ----
            ui.strong("📅 Date Range");
            let (mut start, mut end) = state
                .filters
                .date_range
                .unwrap_or((bounds.first_invoice.date(), bounds.last_invoice.date()));
            ui.horizontal(|ui: &mut Ui| {
                changed |= ui
                    .add(DatePickerButton::new(&mut start).id_salt("date_start"))
                    .changed();
                ui.label("to");
                changed |= ui
                    .add(DatePickerButton::new(&mut end).id_salt("date_end"))
                    .changed();
            });
            state.filters.date_range = Some((start, end));
            ui.separator();

            // ---- Countries ----
            let n_selected = state.filters.countries.len();
            let header = if n_selected == 0 {
                format!("🌍 Countries  (all {})", table.countries.len())
            } else {
                format!("🌍 Countries  ({n_selected}/{})", table.countries.len())
            };
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("countries")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            actions.push(Action::AllCountries);
                        }
                        if ui.small_button("None").on_hover_text("No restriction").clicked() {
                            actions.push(Action::ClearCountries);
                        }
                    });
                    for country in &table.countries {
                        let mut checked = state.filters.countries.contains(country);
                        let text = RichText::new(country).color(state.color_map.color_for(country));
                        if ui.checkbox(&mut checked, text).changed() {
                            actions.push(Action::ToggleCountry(country.clone()));
                        }
                    }
                });
            ui.separator();

            // ---- Products ----
            let header = format!("📦 Products (Optional)  ({})", state.filters.products.len());
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("products")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("Search");
                        ui.text_edit_singleline(&mut state.product_search);
                    });
                    if ui.small_button("Clear selection").clicked() {
                        actions.push(Action::ClearProducts);
                    }

                    let needle = state.product_search.to_lowercase();
                    let selected: Vec<String> = state.filters.products.iter().cloned().collect();
                    let matching: Vec<String> = state
                        .product_options
                        .iter()
                        .filter(|p| !state.filters.products.contains(*p))
                        .filter(|p| needle.is_empty() || p.to_lowercase().contains(&needle))
                        .take(MAX_PRODUCT_ROWS)
                        .cloned()
                        .collect();

                    for product in selected.iter().chain(&matching) {
                        let mut checked = state.filters.products.contains(product);
                        if ui.checkbox(&mut checked, product.as_str()).changed() {
                            actions.push(Action::ToggleProduct(product.clone()));
                        }
                    }
                    if matching.len() == MAX_PRODUCT_ROWS {
                        ui.weak("… refine the search to see more");
                    }
                });
            ui.separator();

            // ---- Customer segment / search ----
            ui.strong("👥 Customer Segment");
            let current = state.filters.customer_segment;
            egui::ComboBox::from_id_salt("customer_segment")
                .selected_text(current.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for segment in CustomerSegment::ALL {
                        if ui
                            .selectable_label(segment == current, segment.label())
                            .clicked()
                        {
                            actions.push(Action::Segment(segment));
                        }
                    }
                });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("CustomerID");
                changed |= ui
                    .text_edit_singleline(&mut state.filters.customer_search)
                    .changed();
            });
            ui.separator();

            // ---- Quantity / price ----
            ui.strong("🔢 Quantity Range");
            let (mut q_lo, mut q_hi) = state
                .filters
                .quantity_range
                .unwrap_or((bounds.min_quantity, bounds.max_quantity));
            let q_span = bounds.min_quantity..=bounds.max_quantity;
            changed |= ui
                .add(egui::Slider::new(&mut q_lo, q_span.clone()).text("min"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut q_hi, q_span).text("max"))
                .changed();
            state.filters.quantity_range = Some((q_lo, q_hi));

            ui.strong("💰 Unit Price Range (£)");
            let (mut p_lo, mut p_hi) = state
                .filters
                .price_range
                .unwrap_or((bounds.min_price, bounds.max_price));
            let p_span = bounds.min_price..=bounds.max_price;
            changed |= ui
                .add(egui::Slider::new(&mut p_lo, p_span.clone()).text("min"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut p_hi, p_span).text("max"))
                .changed();
            state.filters.price_range = Some((p_lo, p_hi));
            ui.separator();

            ui.horizontal(|ui: &mut Ui| {
                if ui.button("↺ Reset").clicked() {
                    actions.push(Action::Reset);
                }
                if ui.button("💾 Export Data").clicked() {
                    actions.push(Action::Export);
                }
            });
        });

    if changed {
        state.refilter();
    }
    for action in actions {
        match action {
            Action::ToggleCountry(country) => state.toggle_country(&country),
            Action::ToggleProduct(product) => state.toggle_product(&product),
            Action::AllCountries => state.select_all_countries(),
            Action::ClearCountries => state.clear_countries(),
            Action::ClearProducts => state.clear_products(),
            Action::Segment(segment) => state.set_segment(segment),
            Action::Reset => state.reset_filters(),
            Action::Export => export_file_dialog(state),
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
            if ui.button("Export filtered CSV…").clicked() {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} transactions loaded, {} visible",
                table.len(),
                state.visible_rows
            ));
        } else {
            ui.label(format!("{}", state.source.path().display()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open retail transactions")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered data")
        .set_file_name("retail_data.csv")
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match state.export_to(&path) {
            Ok(rows) => {
                state.status_message = None;
                log::info!("Exported {rows} rows to {}", path.display());
            }
            Err(e) => {
                log::error!("Export failed: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
