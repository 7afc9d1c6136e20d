//! Rendering of the election-results map as a self-contained Leaflet page.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

/// One municipality marker on the results map.
pub struct Marker {
    pub municipality: String,
    pub lat: f64,
    pub lon: f64,
    pub winning_party: String,
}

/// The placeholder result set rendered until per-municipality winners are
/// wired to a real source.
pub fn sample_markers() -> Vec<Marker> {
    let samples = [
        ("Município A", -23.5505, -46.6333, "partido_a"),
        ("Município B", -22.9068, -43.1729, "partido_b"),
        ("Município C", -21.1775, -44.8709, "partido_c"),
    ];
    samples
        .into_iter()
        .map(|(municipality, lat, lon, party)| Marker {
            municipality: municipality.to_string(),
            lat,
            lon,
            winning_party: party.to_string(),
        })
        .collect()
}

fn party_color(party: &str) -> &'static str {
    match party {
        "partido_a" => "blue",
        "partido_b" => "red",
        "partido_c" => "green",
        _ => "gray",
    }
}

fn escape_js(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Writes a standalone HTML page centered on Brazil with one circle marker
/// per entry. Markers are rendered in a single pass over the slice.
pub fn render_map(path: &Path, markers: &[Marker]) -> io::Result<()> {
    let mut script = String::new();
    let _ = writeln!(
        script,
        "var map = L.map('map').setView([-15.7801, -47.9292], 4);\n\
         L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{\n\
           attribution: '&copy; OpenStreetMap contributors'\n\
         }}).addTo(map);"
    );
    for marker in markers {
        let _ = writeln!(
            script,
            "L.circleMarker([{lat}, {lon}], {{\n\
               radius: 8, color: '{color}', fillColor: '{color}', fillOpacity: 0.8\n\
             }}).addTo(map).bindPopup('{name}: {party}');",
            lat = marker.lat,
            lon = marker.lon,
            color = party_color(&marker.winning_party),
            name = escape_js(&marker.municipality),
            party = escape_js(&marker.winning_party),
        );
    }

    let page = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n\
         <meta charset=\"utf-8\"/>\n\
         <title>Resultado das Eleições</title>\n\
         <link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.css\"/>\n\
         <script src=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.js\"></script>\n\
         <style>html, body, #map {{ height: 100%; margin: 0; }}</style>\n\
         </head>\n<body>\n<div id=\"map\"></div>\n\
         <script>\n{script}</script>\n</body>\n</html>\n"
    );
    fs::write(path, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_page_contains_every_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapa.html");
        render_map(&path, &sample_markers()).unwrap();
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("leaflet.js"));
        assert!(html.contains("Município A: partido_a"));
        assert!(html.contains("'blue'"));
        assert!(html.contains("'green'"));
    }

    #[test]
    fn unknown_parties_fall_back_to_gray() {
        assert_eq!(party_color("partido_x"), "gray");
    }

    #[test]
    fn popup_text_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapa.html");
        let markers = vec![Marker {
            municipality: "Sant'Ana".to_string(),
            lat: -20.0,
            lon: -45.0,
            winning_party: "partido_a".to_string(),
        }];
        render_map(&path, &markers).unwrap();
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("Sant\\'Ana"));
    }
}
