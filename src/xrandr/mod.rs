//! xrandr driver.
//!
//! Queries live outputs and applies profiles by running the xrandr
//! executable with an explicit argument vector.

pub mod parse;

use std::collections::HashMap;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Profile, XrandrConnection};

pub const EXECUTABLE: &str = "/usr/bin/xrandr";

const OUTPUT_KEY: &str = "--output";
const MODE_KEY: &str = "--mode";
const POS_KEY: &str = "--pos";
const ROTATE_KEY: &str = "--rotate";
const PANNING_KEY: &str = "--panning";
const SCALE_KEY: &str = "--scale";
const RATE_KEY: &str = "--rate";
const CRTC_KEY: &str = "--crtc";
const PRIMARY_KEY: &str = "--primary";
const QUERY_KEY: &str = "-q";
const VERBOSE_KEY: &str = "--verbose";
const OFF_KEY: &str = "--off";

/// What the rest of the program needs from the display server.
pub trait DisplayBackend {
    /// Apply the profile, switching off every output it does not mention.
    fn apply(&self, profile: &Profile) -> Result<()>;

    /// All outputs, connected or not. EDID and CRTC are not filled in.
    fn get_all_outputs(&self) -> Result<Vec<XrandrConnection>>;

    /// Connected outputs with EDID and CRTC attached.
    fn get_connected_outputs(&self) -> Result<Vec<XrandrConnection>>;
}

pub struct Xrandr {
    executable: String,
    env: Vec<(&'static str, String)>,
}

impl Xrandr {
    /// Session variables are captured here and passed to every xrandr run.
    /// `None` leaves the inherited environment in place.
    pub fn new(display: Option<String>, xauthority: Option<String>) -> Self {
        let mut env = Vec::new();
        if let Some(display) = display {
            env.push(("DISPLAY", display));
        }
        if let Some(xauthority) = xauthority {
            env.push(("XAUTHORITY", xauthority));
        }
        Xrandr {
            executable: EXECUTABLE.to_string(),
            env,
        }
    }

    /// Run xrandr and return its stdout. Anything on stderr is a failure,
    /// whatever the exit status says.
    fn xrandr(&self, args: &[String]) -> Result<String> {
        debug!("Calling xrandr with args {:?}", args);
        let output = Command::new(&self.executable)
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (*k, v.as_str())))
            .output()?;

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut full_args = vec![self.executable.clone()];
            full_args.extend_from_slice(args);
            return Err(Error::Xrandr {
                message: stderr.trim().to_string(),
                args: full_args,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// EDID and CRTC of every connected output, from `xrandr -q --verbose`.
    fn get_details(&self) -> Result<HashMap<String, (Option<String>, Option<u32>)>> {
        let verbose = self.xrandr(&[QUERY_KEY.to_string(), VERBOSE_KEY.to_string()])?;
        let details = parse::query_items(&verbose)
            .into_iter()
            .filter(|item| item[0].contains(" connected"))
            .filter_map(|item| {
                let name = item[0].split_whitespace().next()?.to_string();
                let edid = parse::field_from_query_item(&item, "EDID").filter(|e| !e.is_empty());
                let crtc = parse::field_from_query_item(&item, "CRTC").and_then(|c| c.parse().ok());
                Some((name, (edid, crtc)))
            })
            .collect();
        Ok(details)
    }
}

impl DisplayBackend for Xrandr {
    fn apply(&self, profile: &Profile) -> Result<()> {
        info!("Applying profile {}", profile.name);
        let args = compose_mode_args(profile, &self.get_all_outputs()?);
        self.xrandr(&args)?;
        Ok(())
    }

    fn get_all_outputs(&self) -> Result<Vec<XrandrConnection>> {
        let query = self.xrandr(&[QUERY_KEY.to_string()])?;
        parse::parse_query(&query)
    }

    fn get_connected_outputs(&self) -> Result<Vec<XrandrConnection>> {
        let mut outputs: Vec<XrandrConnection> = self
            .get_all_outputs()?
            .into_iter()
            .filter(XrandrConnection::is_connected)
            .collect();

        let details = self.get_details()?;
        for output in outputs.iter_mut() {
            if let Some((edid, crtc)) = details.get(&output.name) {
                if let Some(display) = output.display.as_mut() {
                    display.edid = edid.clone();
                }
                if output.is_active() {
                    output.crtc = *crtc;
                }
            }
        }
        debug!("Connected outputs: {:?}", outputs);
        Ok(outputs)
    }
}

/// Build the xrandr arguments that apply `profile` and switch off every
/// other live output.
pub fn compose_mode_args(profile: &Profile, connections: &[XrandrConnection]) -> Vec<String> {
    let mut args = Vec::new();

    for (name, output) in profile.outputs.iter() {
        args.extend(
            [
                OUTPUT_KEY,
                name,
                MODE_KEY,
                output.mode.as_str(),
                POS_KEY,
                output.pos.as_str(),
                ROTATE_KEY,
                output.rotate.as_str(),
                PANNING_KEY,
                output.panning.as_str(),
                SCALE_KEY,
                output.scale.as_str(),
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        if let Some(rate) = &output.rate {
            args.push(RATE_KEY.to_string());
            args.push(rate.clone());
        }
        if let Some(crtc) = output.crtc {
            args.push(CRTC_KEY.to_string());
            args.push(crtc.to_string());
        }
        if profile.primary.as_deref() == Some(name) {
            args.push(PRIMARY_KEY.to_string());
        }
    }

    for connection in connections {
        if !profile.outputs.contains_key(&connection.name) {
            args.push(OUTPUT_KEY.to_string());
            args.push(connection.name.clone());
            args.push(OFF_KEY.to_string());
        }
    }
    args
}
