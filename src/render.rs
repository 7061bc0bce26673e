use crate::aggregate::Aggregate;
use crate::classify::ThresholdScale;
use crate::config::{OutputConfig, OutputFormat};
use crate::projection::Mercator;
use crate::types::CountryFeature;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fmt::Write;
use std::fs;
use tracing::info;

const STROKE: &str = "#333";
const STROKE_WIDTH: f64 = 0.5;
const LEGEND_GAP: f64 = 5.0;

const HOVER_SCRIPT: &str = r##"<script>
const tooltip = document.getElementById("tooltip");
function moveTooltip(event) {
  tooltip.style.top = (event.pageY + 10) + "px";
  tooltip.style.left = (event.pageX + 10) + "px";
}
document.querySelectorAll("#countries path").forEach(path => {
  path.addEventListener("mouseover", event => {
    tooltip.innerHTML = path.dataset.tooltip;
    tooltip.style.visibility = "visible";
    moveTooltip(event);
  });
  path.addEventListener("mousemove", moveTooltip);
  path.addEventListener("mouseout", () => {
    tooltip.style.visibility = "hidden";
  });
});
</script>
"##;

const TOOLTIP_STYLE: &str = "position: absolute; visibility: hidden; background: #fff; \
border: 1px solid #333; border-radius: 4px; padding: 6px 8px; \
font: 12px sans-serif; pointer-events: none;";

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Mean AQI to two decimals, or "No data".
pub fn format_aqi(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.2}", v),
        _ => "No data".to_string(),
    }
}

/// Markup shown in the floating hover label.
pub fn tooltip_html(name: &str, value: Option<f64>) -> String {
    format!("<strong>{}</strong><br>AQI: {}", escape_xml(name), format_aqi(value))
}

/// Plain-text form of the hover label.
pub fn tooltip_text(name: &str, value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{}: AQI {:.2}", name, v),
        _ => format!("{}: No data", name),
    }
}

pub struct MapRenderer<'a> {
    aggregate: &'a Aggregate,
    scale: &'a ThresholdScale,
    projection: Mercator,
    output: &'a OutputConfig,
}

impl<'a> MapRenderer<'a> {
    pub fn new(aggregate: &'a Aggregate, scale: &'a ThresholdScale, output: &'a OutputConfig) -> Self {
        Self {
            aggregate,
            scale,
            projection: Mercator::centered(output.projection_scale, output.width, output.height),
            output,
        }
    }

    /// The `<path>` element for one country.
    pub fn country_path(&self, feature: &CountryFeature) -> String {
        let value = self.aggregate.value(&feature.name);
        let name = escape_xml(&feature.name);
        format!(
            "<path d=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\" data-name=\"{}\" data-tooltip=\"{}\"><title>{}</title></path>",
            self.projection.path_data(&feature.geometry),
            self.scale.color_for(value),
            STROKE,
            STROKE_WIDTH,
            name,
            escape_xml(&tooltip_html(&feature.name, value)),
            escape_xml(&tooltip_text(&feature.name, value)),
        )
    }

    pub fn legend(&self) -> String {
        let [lx, ly] = self.output.legend_offset;
        let size = self.output.legend_swatch;
        let mut g = format!("<g id=\"legend\" transform=\"translate({}, {})\">\n", lx, ly);

        for (i, entry) in self.scale.legend().iter().enumerate() {
            let y = i as f64 * (size + LEGEND_GAP);
            let _ = writeln!(
                g,
                "<rect x=\"0\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
                y,
                size,
                size,
                escape_xml(&entry.color)
            );
            let _ = writeln!(
                g,
                "<text x=\"{}\" y=\"{:.2}\" style=\"font-size: 12px\">{}</text>",
                size + 10.0,
                y + size / 1.5,
                escape_xml(&entry.label)
            );
        }

        g.push_str("</g>\n");
        g
    }

    pub fn render_svg(&self, features: &[CountryFeature]) -> String {
        let paths: Vec<String> = features.par_iter().map(|f| self.country_path(f)).collect();

        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = self.output.width,
            h = self.output.height
        );
        svg.push_str("<g id=\"countries\">\n");
        for path in paths {
            svg.push_str(&path);
            svg.push('\n');
        }
        svg.push_str("</g>\n");
        svg.push_str(&self.legend());
        svg.push_str("</svg>\n");
        svg
    }

    pub fn render_html(&self, features: &[CountryFeature]) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Average AQI by Country</title>\n</head>\n<body>\n",
        );
        html.push_str("<div id=\"viz1\">\n");
        html.push_str(&self.render_svg(features));
        html.push_str("</div>\n");
        let _ = writeln!(html, "<div id=\"tooltip\" style=\"{}\"></div>", TOOLTIP_STYLE);
        html.push_str(HOVER_SCRIPT);
        html.push_str("</body>\n</html>\n");
        html
    }

    pub fn render(&self, features: &[CountryFeature]) -> String {
        match self.output.format {
            OutputFormat::Svg => self.render_svg(features),
            OutputFormat::Html => self.render_html(features),
        }
    }
}

pub fn write_map(
    output: &OutputConfig,
    aggregate: &Aggregate,
    scale: &ThresholdScale,
    features: &[CountryFeature],
) -> Result<()> {
    let renderer = MapRenderer::new(aggregate, scale, output);
    let document = renderer.render(features);

    let matched = features
        .iter()
        .filter(|f| aggregate.value(&f.name).is_some())
        .count();
    info!(
        "Rendered {} countries ({} with data, {} without)",
        features.len(),
        matched,
        features.len() - matched
    );

    if let Some(parent) = output.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    fs::write(&output.path, document)
        .with_context(|| format!("Failed to write map: {:?}", output.path))?;
    info!("Wrote {:?}", output.path);
    Ok(())
}
