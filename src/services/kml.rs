// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! KML track export.
//!
//! Consumes enriched activities and renders one Placemark per activity:
//! display string as the name, metadata and segment efforts as an HTML
//! description, and the track coordinates as a LineString. Activities
//! without track geometry are never rendered.

use crate::models::Activity;
use crate::time_utils::format_duration;

/// KML line style for one activity type (`aabbggrr` color).
#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: String,
    pub width: u32,
}

impl LineStyle {
    pub fn new(color: &str, width: u32) -> Self {
        Self {
            color: color.to_string(),
            width,
        }
    }
}

/// KML document builder.
#[derive(Debug, Clone)]
pub struct KmlExporter {
    /// Styles by id, in emission order. Commute activities use the
    /// "commute" style regardless of type.
    styles: Vec<(String, LineStyle)>,
    document_name: String,
}

impl Default for KmlExporter {
    fn default() -> Self {
        Self {
            styles: vec![
                ("ride".to_string(), LineStyle::new("C00000A0", 4)),
                ("run".to_string(), LineStyle::new("C0A00000", 4)),
                ("hike".to_string(), LineStyle::new("C000A000", 4)),
                ("commute".to_string(), LineStyle::new("C0A0A0A0", 4)),
                ("default".to_string(), LineStyle::new("C0000000", 4)),
            ],
            document_name: "Strava Activities".to_string(),
        }
    }
}

impl KmlExporter {
    pub fn new(styles: Vec<(String, LineStyle)>, document_name: &str) -> Self {
        Self {
            styles,
            document_name: document_name.to_string(),
        }
    }

    /// Render the KML document for all activities that carry geometry.
    pub fn export(&self, activities: &[Activity]) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n");
        out.push_str("  <Document>\n");
        out.push_str(&format!(
            "    <name>{}</name>\n",
            escape_xml(&self.document_name)
        ));

        for (id, style) in &self.styles {
            out.push_str(&format!(
                "    <Style id=\"{}\">\n      <LineStyle>\n        <color>{}</color>\n        <width>{}</width>\n      </LineStyle>\n    </Style>\n",
                escape_xml(id),
                escape_xml(&style.color),
                style.width
            ));
        }

        let mut rendered = 0usize;
        for activity in activities {
            if !activity.has_track_geometry() {
                tracing::debug!(
                    activity_id = activity.id,
                    "Activity has no track geometry, not exported"
                );
                continue;
            }
            out.push_str(&self.placemark(activity));
            rendered += 1;
        }

        out.push_str("  </Document>\n");
        out.push_str("</kml>\n");

        tracing::info!(total = activities.len(), rendered, "KML document rendered");
        out
    }

    fn placemark(&self, activity: &Activity) -> String {
        let mut out = String::new();
        out.push_str("    <Placemark>\n");
        out.push_str(&format!(
            "      <name>{}</name>\n",
            escape_xml(activity.display())
        ));
        out.push_str(&format!(
            "      <styleUrl>#{}</styleUrl>\n",
            self.style_id(activity)
        ));
        out.push_str(&format!(
            "      <TimeStamp><when>{}</when></TimeStamp>\n",
            escape_xml(&activity.start_date)
        ));
        out.push_str(&format!(
            "      <description>{}</description>\n",
            escape_xml(&description_html(activity))
        ));
        out.push_str("      <LineString>\n        <tessellate>1</tessellate>\n        <coordinates>");
        let coords: Vec<String> = activity
            .track()
            .coords()
            .map(|c| format!("{:.6},{:.6},0", c.x, c.y))
            .collect();
        out.push_str(&coords.join(" "));
        out.push_str("</coordinates>\n      </LineString>\n");
        out.push_str("    </Placemark>\n");
        out
    }

    /// Pick a style id: commute style wins, then activity type, then default.
    fn style_id(&self, activity: &Activity) -> &str {
        if activity.commute && self.styles.iter().any(|(id, _)| id == "commute") {
            return "commute";
        }
        let type_id = activity.activity_type.to_lowercase();
        if let Some((id, _)) = self.styles.iter().find(|(id, _)| *id == type_id) {
            return id;
        }
        "default"
    }
}

/// HTML description block: metadata table plus segment-effort list.
fn description_html(activity: &Activity) -> String {
    let mut rows = Vec::new();
    for (key, value) in activity.metadata() {
        if key == "description" {
            continue;
        }
        rows.push(format!("<tr><td>{}</td><td>{}</td></tr>", key, value));
    }
    let mut out = format!("<table>{}</table>", rows.join(""));

    if let Some(text) = activity.description() {
        out.push_str(&format!("<p>{}</p>", text.replace('\n', "<br/>")));
    }

    if !activity.segments().is_empty() {
        let items: Vec<String> = activity
            .segments()
            .iter()
            .map(|effort| {
                let rank = effort
                    .rank
                    .map(|r| format!(" (KOM rank {})", r))
                    .unwrap_or_default();
                format!(
                    "<li>{}: {}{}</li>",
                    effort.name,
                    format_duration(effort.elapsed_time),
                    rank
                )
            })
            .collect();
        out.push_str(&format!("<b>Segments</b><ul>{}</ul>", items.join("")));
    }

    out
}

/// Escape text content for XML.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
