//! egui overlay: dataset summary, hovered point details, selection box.

use scatterpick::{MetadataValue, PointMetadata};

/// Everything the HUD shows for one frame.
pub struct HudStats<'a> {
    pub point_count: usize,
    pub dimensions: usize,
    pub selected: usize,
    pub hovered: Option<(usize, Option<&'a PointMetadata>)>,
}

/// Key/value rows describing a point, label and group first.
pub fn describe_point(index: usize, meta: Option<&PointMetadata>) -> Vec<(String, String)> {
    let mut rows = vec![("index".to_owned(), index.to_string())];
    let Some(meta) = meta else {
        return rows;
    };
    if let Some(label) = &meta.label {
        rows.push(("label".to_owned(), label.clone()));
    }
    if let Some(group) = &meta.group {
        rows.push(("group".to_owned(), group.clone()));
    }
    rows.extend(meta.fields.iter().map(|(k, v)| {
        let v = match v {
            MetadataValue::Number(n) => n.to_string(),
            MetadataValue::Text(s) => s.clone(),
        };
        (k.clone(), v)
    }));
    rows
}

pub fn draw_hud(ctx: &egui::Context, stats: &HudStats<'_>) {
    egui::Window::new("Scatter")
        .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            ui.label(format!("{} points ({}D)", stats.point_count, stats.dimensions));
            ui.label(format!("{} selected", stats.selected));
            ui.separator();
            match stats.hovered {
                Some((index, meta)) => {
                    egui::Grid::new("hovered_point").num_columns(2).show(ui, |ui| {
                        for (key, value) in describe_point(index, meta) {
                            ui.label(key);
                            ui.label(value);
                            ui.end_row();
                        }
                    });
                }
                None => {
                    ui.weak("Hover a point for details.");
                }
            }
            ui.separator();
            ui.small("Click: toggle  |  Shift+drag: box select  |  C: clear");
        });
}

/// Outlines the in-progress box selection. `rect` is in logical points.
pub fn draw_selection_box(ctx: &egui::Context, rect: egui::Rect) {
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Foreground,
        egui::Id::new("selection_box"),
    ));
    painter.rect(
        rect,
        0.0,
        egui::Color32::from_rgba_unmultiplied(250, 102, 102, 40),
        egui::Stroke::new(1.0, egui::Color32::from_rgb(250, 102, 102)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_label_group_then_fields() {
        let mut meta = PointMetadata::with_label("cat");
        meta.group = Some("animals".into());
        meta.fields
            .insert("labelIndex".into(), MetadataValue::Number(3.0));
        let rows = describe_point(7, Some(&meta));
        assert_eq!(
            rows,
            vec![
                ("index".to_owned(), "7".to_owned()),
                ("label".to_owned(), "cat".to_owned()),
                ("group".to_owned(), "animals".to_owned()),
                ("labelIndex".to_owned(), "3".to_owned()),
            ]
        );
        assert_eq!(describe_point(1, None).len(), 1);
    }
}
