//! Parsing of `xrandr --query` output.
//!
//! xrandr prints one unindented header line per output followed by
//! indented lines that belong to it: the supported modes for a plain
//! query, or property fields (EDID, CRTC, ...) with `--verbose`.
//!
//! ```text
//! LVDS1 connected primary 1366x768+0+312 (normal left inverted right x axis y axis) 277mm x 156mm
//!    1366x768      60.02*+
//!    1024x768      60.00
//! HDMI1 disconnected (normal left inverted right x axis y axis)
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{Display, Viewport, XrandrConnection};
use crate::orientation::Rotation;

/// Number of hex-dump lines holding the 128 byte base EDID block.
const EDID_LINES: usize = 8;

lazy_static! {
    static ref OUTPUT_DETAILS: Regex = Regex::new(
        r"^(?:(?P<primary>primary) )?(?P<geometry>\d+x\d+\+-?\d+\+-?\d+) (?:(?P<rotate>normal|left|inverted|right) )?.*?(?:panning (?P<panning>\d+x\d+\+-?\d+\+-?\d+).*)?$"
    )
    .unwrap();
    static ref GEOMETRY: Regex = Regex::new(r"^(\d+x\d+)\+(-?\d+)\+(-?\d+)$").unwrap();
    static ref SIZE: Regex = Regex::new(r"^(\d+)x(\d+)").unwrap();
    static ref RATE: Regex = Regex::new(r"(?P<rate>\d+(?:\.\d+)?)(?P<flags>[ *+]*)").unwrap();
}

/// Split query output into per-output items.
///
/// An unindented line opens a new item, an indented line continues the
/// open one. Blank lines are dropped.
pub fn group_query_result<'a, I>(lines: I) -> Vec<Vec<&'a str>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut items = Vec::new();
    let mut current: Option<Vec<&'a str>> = None;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let continuation = line.starts_with(' ') || line.starts_with('\t');
        match current.as_mut() {
            Some(item) if continuation => item.push(line),
            _ => {
                if let Some(item) = current.take() {
                    items.push(item);
                }
                current = Some(vec![line]);
            }
        }
    }
    if let Some(item) = current {
        items.push(item);
    }
    items
}

/// Group the full query output, skipping the leading `Screen N:` line.
pub fn query_items(query: &str) -> Vec<Vec<&str>> {
    group_query_result(query.lines().filter(|line| !line.starts_with("Screen ")))
}

/// Parse every output of a plain `xrandr -q` run.
pub fn parse_query(query: &str) -> Result<Vec<XrandrConnection>> {
    query_items(query)
        .iter()
        .map(|item| parse_xrandr_connection(item))
        .collect()
}

/// Build a connection from one item of the query output.
pub fn parse_xrandr_connection(item: &[&str]) -> Result<XrandrConnection> {
    let header = item.first().map(|line| line.trim()).unwrap_or_default();
    let mut tokens = header.splitn(3, ' ');
    let name = tokens.next().unwrap_or_default();
    let status = tokens.next().unwrap_or_default();
    let state = tokens.next().unwrap_or_default().trim();

    if status != "connected" {
        return Ok(XrandrConnection::new(name));
    }

    let display = parse_display(&item[1..]);
    let current_mode = match &display.mode {
        Some(mode) => mode.clone(),
        None => return Ok(XrandrConnection::with_display(name, display)),
    };

    let parse_error = || Error::Parse {
        name: name.to_string(),
        status: status.to_string(),
        state: state.to_string(),
    };
    let details = OUTPUT_DETAILS.captures(state).ok_or_else(parse_error)?;

    let primary = details.name("primary").is_some();
    let (size, pos) = parse_geometry(&details["geometry"]).ok_or_else(parse_error)?;
    let rotate = details
        .name("rotate")
        .and_then(|r| r.as_str().parse::<Rotation>().ok())
        .unwrap_or_default();
    let panning = details
        .name("panning")
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "0x0".to_string());

    let size = if rotate.swaps_axes() {
        swap_axes(&size)?
    } else {
        size
    };
    let scale = derive_scale(&size, &current_mode, rotate)?;

    Ok(XrandrConnection {
        name: name.to_string(),
        display: Some(display),
        viewport: Some(Viewport {
            size,
            pos,
            rotate,
            panning,
            scale,
        }),
        primary,
        crtc: None,
    })
}

/// Collect supported modes from the indented mode lines.
/// A rate flagged with `*` is the current mode, `+` the preferred one.
fn parse_display(mode_lines: &[&str]) -> Display {
    let mut display = Display::default();

    for line in mode_lines {
        let line = line.trim();
        let (mode, rates) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        if mode.is_empty() {
            continue;
        }
        display.supported_modes.push(mode.to_string());

        for caps in RATE.captures_iter(rates) {
            let flags = &caps["flags"];
            if flags.contains('*') {
                display.mode = Some(mode.to_string());
                display.rate = Some(caps["rate"].to_string());
            }
            if flags.contains('+') {
                display.preferred_mode = Some(mode.to_string());
            }
        }
    }
    display
}

/// Split `WxH+X+Y` into the size `WxH` and the position `XxY`.
pub fn parse_geometry(s: &str) -> Option<(String, String)> {
    let caps = GEOMETRY.captures(s)?;
    Some((caps[1].to_string(), format!("{}x{}", &caps[2], &caps[3])))
}

fn parse_size(s: &str) -> Result<(u32, u32)> {
    let caps = SIZE
        .captures(s)
        .ok_or_else(|| Error::Geometry(s.to_string()))?;
    let width = caps[1].parse().map_err(|_| Error::Geometry(s.to_string()))?;
    let height = caps[2].parse().map_err(|_| Error::Geometry(s.to_string()))?;
    Ok((width, height))
}

fn swap_axes(size: &str) -> Result<String> {
    let (w, h) = parse_size(size)?;
    Ok(format!("{}x{}", h, w))
}

/// Scale of a viewport relative to the physical mode, as `XxY`.
///
/// `size` must already be expressed in the mode's axes. For sideways
/// rotations the factors are swapped back into viewport order.
pub fn derive_scale(size: &str, mode: &str, rotate: Rotation) -> Result<String> {
    let (vw, vh) = parse_size(size)?;
    let (mw, mh) = parse_size(mode)?;
    if (vw, vh) == (mw, mh) {
        return Ok("1x1".to_string());
    }
    if mw == 0 || mh == 0 {
        return Err(Error::Geometry(mode.to_string()));
    }

    let sx = f64::from(vw) / f64::from(mw);
    let sy = f64::from(vh) / f64::from(mh);
    let (sx, sy) = if rotate.swaps_axes() { (sy, sx) } else { (sx, sy) };
    // `{:?}` keeps the fractional part of whole factors: `2.0x2.0`.
    Ok(format!("{:?}x{:?}", sx, sy))
}

/// Extract a `Label: value` field from a verbose query item.
///
/// The value continues on following lines that are indented deeper than
/// the label. EDID stops after the base block.
pub fn field_from_query_item(item: &[&str], field: &str) -> Option<String> {
    let label = format!("{}:", field);
    let max_lines = if field == "EDID" { Some(EDID_LINES) } else { None };

    let mut lines = item.iter().skip(1);
    let (indent, mut value) = lines.by_ref().find_map(|line| {
        let stripped = line.trim_start();
        let rest = stripped.strip_prefix(&label)?;
        Some((line.len() - stripped.len(), rest.trim().to_string()))
    })?;

    let mut taken = 0;
    for line in lines {
        if max_lines.map_or(false, |max| taken >= max) {
            break;
        }
        let stripped = line.trim_start();
        if line.len() - stripped.len() <= indent {
            break;
        }
        value.push_str(stripped.trim_end());
        taken += 1;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_query_result_splits_on_unindented_lines() {
        let query_result = [
            "LVDS1 connected",
            "  1920x1080+*",
            "  1366x768",
            "  1280x800",
            "DP1 connected",
            "  1920x1080+*",
            "HDMI1 disconnected",
            "VGA1 disconnected",
        ];

        let grouped = group_query_result(query_result);

        assert_eq!(grouped.len(), 4);
        assert_eq!(grouped[0], &query_result[0..4]);
        assert_eq!(grouped[1], &query_result[4..6]);
        assert_eq!(grouped[2], &query_result[6..7]);
        assert_eq!(grouped[3], &query_result[7..]);
        assert_eq!(grouped.concat(), query_result);
    }

    #[test]
    fn group_query_result_accepts_tabs() {
        let grouped = group_query_result(["eDP1 connected", "\tEDID:", "\t\t00ff", "DP1 disconnected"]);
        assert_eq!(grouped, vec![vec!["eDP1 connected", "\tEDID:", "\t\t00ff"], vec!["DP1 disconnected"]]);
    }

    #[test]
    fn query_items_skip_screen_line() {
        let query = "Screen 0: minimum 8 x 8, current 1366 x 768, maximum 32767 x 32767\n\
                     LVDS1 connected 1366x768+0+0 (normal left inverted right x axis y axis) 277mm x 156mm\n   \
                     1366x768      60.02*+\n\
                     VGA1 disconnected (normal left inverted right x axis y axis)\n";
        let items = query_items(query);
        assert_eq!(items.len(), 2);
        assert!(items[0][0].starts_with("LVDS1"));
        assert_eq!(items[1], vec!["VGA1 disconnected (normal left inverted right x axis y axis)"]);
    }

    #[test]
    fn parse_xrandr_connection_not_connected() -> Result<()> {
        let connection =
            parse_xrandr_connection(&["HDMI1 disconnected (normal left inverted right x axis y axis)"])?;

        assert_eq!(connection.name, "HDMI1");
        assert!(connection.display.is_none());
        assert!(connection.viewport.is_none());
        assert!(!connection.primary);
        Ok(())
    }

    #[test]
    fn parse_xrandr_connection_not_active() -> Result<()> {
        let connection = parse_xrandr_connection(&[
            "HDMI1 connected (normal left inverted right x axis y axis)",
            "    1920x1080     60.00 +",
            "    1280x1024     75.02    60.02",
            "    800x600       75.00    60.32",
        ])?;

        assert_eq!(connection.name, "HDMI1");
        let display = connection.display.as_ref().unwrap();
        assert_eq!(display.rate, None);
        assert_eq!(display.mode, None);
        assert_eq!(display.preferred_mode.as_deref(), Some("1920x1080"));
        assert_eq!(display.supported_modes, ["1920x1080", "1280x1024", "800x600"]);
        assert!(connection.viewport.is_none());
        assert!(!connection.primary);
        Ok(())
    }

    #[test]
    fn parse_xrandr_connection_invalid_state() {
        let result = parse_xrandr_connection(&[
            "HDMI1 connected (normal left inverted right x axis y axis)",
            "    1920x1080     60.00*+",
            "    1280x1024     75.02    60.02",
        ]);

        match result {
            Err(Error::Parse { name, status, .. }) => {
                assert_eq!(name, "HDMI1");
                assert_eq!(status, "connected");
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn parse_xrandr_connection_simple_viewport() -> Result<()> {
        let connection = parse_xrandr_connection(&[
            "eDP1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 270mm x 150mm",
            "    1920x1080     60.00*+  48.00",
        ])?;

        let display = connection.display.as_ref().unwrap();
        assert_eq!(display.rate.as_deref(), Some("60.00"));
        assert_eq!(display.mode.as_deref(), Some("1920x1080"));
        assert_eq!(display.preferred_mode.as_deref(), Some("1920x1080"));
        assert_eq!(display.supported_modes, ["1920x1080"]);

        let viewport = connection.viewport.as_ref().unwrap();
        assert_eq!(viewport.size, "1920x1080");
        assert_eq!(viewport.panning, "0x0");
        assert_eq!(viewport.rotate, Rotation::Normal);
        assert_eq!(viewport.pos, "0x0");
        assert_eq!(viewport.scale, "1x1");
        assert!(connection.primary);
        Ok(())
    }

    #[test]
    fn parse_xrandr_connection_not_primary() -> Result<()> {
        let connection = parse_xrandr_connection(&[
            "eDP1 connected 1920x1080+0+0 (normal left inverted right x axis y axis) 270mm x 150mm",
            "    1920x1080     60.00*+  48.00",
        ])?;
        assert!(connection.is_active());
        assert!(!connection.primary);
        Ok(())
    }

    #[test]
    fn parse_xrandr_connection_rotated_positioned() -> Result<()> {
        let connection = parse_xrandr_connection(&[
            "eDP1 connected 1920x1080+1280+800 left (normal left inverted right x axis y axis) 270mm x 150mm",
            "    1920x1080     60.00*+  48.00",
        ])?;

        let viewport = connection.viewport.as_ref().unwrap();
        assert_eq!(viewport.size, "1080x1920");
        assert_eq!(viewport.panning, "0x0");
        assert_eq!(viewport.rotate, Rotation::Left);
        assert_eq!(viewport.pos, "1280x800");
        assert_eq!(viewport.scale, "1.7777777777777777x0.5625");
        assert!(!connection.primary);
        Ok(())
    }

    #[test]
    fn parse_xrandr_connection_positioned_panned() -> Result<()> {
        let connection = parse_xrandr_connection(&[
            "eDP1 connected primary 1920x1080+1280+800 (normal left inverted right x axis y axis) 270mm x 150mm panning 1920x1080+1280+800",
            "    1920x1080     60.00*+  48.00",
        ])?;

        let viewport = connection.viewport.as_ref().unwrap();
        assert_eq!(viewport.size, "1920x1080");
        assert_eq!(viewport.panning, "1920x1080+1280+800");
        assert_eq!(viewport.rotate, Rotation::Normal);
        assert_eq!(viewport.pos, "1280x800");
        assert_eq!(viewport.scale, "1x1");
        assert!(connection.primary);
        Ok(())
    }

    #[test]
    fn parse_xrandr_connection_scaled_positioned() -> Result<()> {
        let connection = parse_xrandr_connection(&[
            "eDP1 connected primary 2496x1404+1920+1080 (normal left inverted right x axis y axis) 270mm x 150mm panning 2496x1404+1920+1080",
            "    1920x1080     60.00*+  48.00",
        ])?;

        let viewport = connection.viewport.as_ref().unwrap();
        assert_eq!(viewport.size, "2496x1404");
        assert_eq!(viewport.panning, "2496x1404+1920+1080");
        assert_eq!(viewport.pos, "1920x1080");
        assert_eq!(viewport.scale, "1.3x1.3");
        Ok(())
    }

    #[test]
    fn current_rate_is_the_starred_one() -> Result<()> {
        let connection = parse_xrandr_connection(&[
            "DP1 connected 1920x1080+0+0 (normal left inverted right x axis y axis) 530mm x 300mm",
            "   1920x1200     59.95 +",
            "   1920x1080     60.00    50.00*",
        ])?;

        let display = connection.display.unwrap();
        assert_eq!(display.mode.as_deref(), Some("1920x1080"));
        assert_eq!(display.rate.as_deref(), Some("50.00"));
        assert_eq!(display.preferred_mode.as_deref(), Some("1920x1200"));
        Ok(())
    }

    #[test]
    fn rotation_only_changes_scale_axis() -> Result<()> {
        let straight = derive_scale("1920x1200", "1280x800", Rotation::Normal)?;
        assert_eq!(straight, "1.5x1.5");

        let sideways = derive_scale("1200x1600", "1600x1200", Rotation::Right)?;
        let plain = derive_scale("1200x1600", "1600x1200", Rotation::Normal)?;
        let (sx, sy) = sideways.split_once('x').unwrap();
        assert_eq!(format!("{}x{}", sy, sx), plain);
        Ok(())
    }

    #[test]
    fn whole_scale_factors_keep_their_fraction() -> Result<()> {
        assert_eq!(derive_scale("3840x2160", "1920x1080", Rotation::Normal)?, "2.0x2.0");
        assert_eq!(derive_scale("1920x1080", "1920x1080", Rotation::Normal)?, "1x1");
        Ok(())
    }

    #[test]
    fn parsed_panning_covers_the_viewport() -> Result<()> {
        for line in [
            "eDP1 connected primary 1920x1080+1280+800 (normal left inverted right x axis y axis) 270mm x 150mm panning 1920x1080+1280+800",
            "eDP1 connected 1920x1080+0+0 (normal left inverted right x axis y axis) 270mm x 150mm panning 2560x1440+0+0",
        ] {
            let connection = parse_xrandr_connection(&[line, "    1920x1080     60.00*+"])?;
            let viewport = connection.viewport.unwrap();
            let (pw, ph) = parse_size(&viewport.panning)?;
            let (vw, vh) = parse_size(&viewport.size)?;
            assert!(pw >= vw && ph >= vh, "{} does not cover {}", viewport.panning, viewport.size);
        }
        Ok(())
    }

    #[test]
    fn parse_geometry_splits_size_and_position() {
        assert_eq!(
            parse_geometry("1920x1080+100+200"),
            Some(("1920x1080".to_string(), "100x200".to_string()))
        );
        assert_eq!(parse_geometry("1920x1080"), None);
    }

    #[test]
    fn edid_from_query_item() {
        let item = [
            "LVDS1 connected foo bar",
            "\tIdentifier: 0x45",
            "\tTimestamp: 123456789",
            "\tEDID:",
            "\t\t0",
            "\t\t1",
            "\t\t2",
            "\t\t3",
            "\t\t4",
            "\t\t5",
            "\t\t6",
            "\t\t7",
            "\t\t8",
            "\t\t9",
            "\t\t10",
            "\tBroadcast RGB: Automatic",
            "\t\tsupported: Automatic, Full",
            "\taudio: auto",
            "\t\tsupported: auto, on",
        ];

        assert_eq!(field_from_query_item(&item, "EDID").as_deref(), Some("01234567"));
        assert_eq!(field_from_query_item(&item, "Identifier").as_deref(), Some("0x45"));
        assert_eq!(field_from_query_item(&item, "CRTC"), None);
    }

    #[test]
    fn short_edid_stops_at_dedent() {
        let item = ["DP1 connected", "\tEDID:", "\t\t00ffffff", "\t\tffffff00", "\tCRTC:       1"];
        assert_eq!(field_from_query_item(&item, "EDID").as_deref(), Some("00ffffffffffff00"));
        assert_eq!(field_from_query_item(&item, "CRTC").as_deref(), Some("1"));
    }
}
