use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::path::Path;

use crate::config::MalformedPolicy;
use crate::event::{DecayType, Event};
use crate::vecmath::FourVector;

// One CSV row describes one photon; consecutive rows sharing an event_id
// form one event. Emission coordinates are mm (t in seconds), momenta MeV.
#[derive(Debug, Deserialize)]
struct PhotonRow {
    event_id: i64,
    decay_type: String,
    #[serde(default = "default_weight")]
    weight: f64,
    ex: f64,
    ey: f64,
    ez: f64,
    #[serde(default)]
    et: f64,
    px: f64,
    py: f64,
    pz: f64,
    e: f64,
}

fn default_weight() -> f64 { 1.0 }

/// Reads event records from a CSV file. Identifier assignment is owned
/// here: the loader's counter hands out run-unique ids in file order, the
/// `event_id` column only delimits which rows belong together.
pub struct EventLoader {
    next_id: i64,
}

impl EventLoader {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    pub fn load<P: AsRef<Path>>(
        &mut self,
        path: P,
        on_malformed: MalformedPolicy,
    ) -> Result<Vec<Event>> {
        let path_ref = path.as_ref();
        let reader = csv::Reader::from_path(path_ref)
            .with_context(|| format!("Failed to open events file '{}'", path_ref.display()))?;
        self.load_from_reader(reader, on_malformed)
            .with_context(|| format!("While reading '{}'", path_ref.display()))
    }

    pub fn load_from_reader<R: std::io::Read>(
        &mut self,
        mut reader: csv::Reader<R>,
        on_malformed: MalformedPolicy,
    ) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        let mut group: Vec<PhotonRow> = Vec::new();
        let mut skipped = 0usize;

        for record in reader.deserialize() {
            let row: PhotonRow = record.context("Invalid event record row")?;
            if let Some(first) = group.first() {
                if first.event_id != row.event_id {
                    let flushed = std::mem::take(&mut group);
                    self.flush_group(flushed, on_malformed, &mut events, &mut skipped)?;
                }
            }
            group.push(row);
        }
        if !group.is_empty() {
            self.flush_group(group, on_malformed, &mut events, &mut skipped)?;
        }

        debug!(
            "Loaded {} events ({} malformed records skipped)",
            events.len(),
            skipped
        );
        Ok(events)
    }

    fn flush_group(
        &mut self,
        rows: Vec<PhotonRow>,
        on_malformed: MalformedPolicy,
        events: &mut Vec<Event>,
        skipped: &mut usize,
    ) -> Result<()> {
        let record_id = rows[0].event_id;
        let id = self.next_id;
        match build_event(id, rows) {
            Ok(event) => {
                self.next_id += 1;
                events.push(event);
                Ok(())
            }
            Err(e) => match on_malformed {
                MalformedPolicy::Abort => {
                    Err(e).with_context(|| format!("Malformed event record {record_id}"))
                }
                MalformedPolicy::Skip => {
                    warn!("Skipping malformed event record {record_id}: {e}");
                    *skipped += 1;
                    Ok(())
                }
            },
        }
    }
}

impl Default for EventLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn build_event(id: i64, rows: Vec<PhotonRow>) -> Result<Event> {
    let decay_type = parse_decay_type(&rows[0].decay_type)
        .with_context(|| format!("Unknown decay type '{}'", rows[0].decay_type))?;
    let weight = rows[0].weight;
    let emission_points = rows
        .iter()
        .map(|r| FourVector::new(r.ex, r.ey, r.ez, r.et))
        .collect();
    let four_momenta = rows
        .iter()
        .map(|r| FourVector::new(r.px, r.py, r.pz, r.e))
        .collect();
    Ok(Event::new(id, decay_type, weight, emission_points, four_momenta)?)
}

// Records use either the numeric channel codes (0..=5) or the channel names.
fn parse_decay_type(tag: &str) -> Result<DecayType> {
    if let Ok(code) = tag.trim().parse::<i64>() {
        return DecayType::from_code(code)
            .ok_or_else(|| anyhow::anyhow!("decay code {code} out of range"));
    }
    match tag.trim().to_ascii_lowercase().as_str() {
        "wrong" => Ok(DecayType::Wrong),
        "one" => Ok(DecayType::One),
        "two" => Ok(DecayType::Two),
        "three" => Ok(DecayType::Three),
        "twoandone" | "2+1" => Ok(DecayType::TwoAndOne),
        "twoandn" | "2+n" => Ok(DecayType::TwoAndN),
        other => anyhow::bail!("unrecognized decay type '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "event_id,decay_type,weight,ex,ey,ez,et,px,py,pz,e\n";

    fn load_csv(body: &str, on_malformed: MalformedPolicy) -> Result<Vec<Event>> {
        let data = format!("{HEADER}{body}");
        let reader = csv::Reader::from_reader(data.as_bytes());
        EventLoader::new().load_from_reader(reader, on_malformed)
    }

    #[test]
    fn groups_rows_into_events_with_fresh_ids() {
        let events = load_csv(
            "10,two,1.0,0,0,0,0,0.511,0,0,0.511\n\
             10,two,1.0,0,0,0,0,-0.511,0,0,0.511\n\
             11,one,0.5,1,2,3,0,0,0,0.3,0.3\n",
            MalformedPolicy::Abort,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id(), 0);
        assert_eq!(events[0].num_products(), 2);
        assert_eq!(events[0].decay_type(), DecayType::Two);
        assert_eq!(events[1].id(), 1);
        assert_eq!(events[1].weight(), 0.5);
    }

    #[test]
    fn numeric_decay_codes_accepted() {
        let events =
            load_csv("3,4,1.0,0,0,0,0,0.511,0,0,0.511\n", MalformedPolicy::Abort).unwrap();
        assert_eq!(events[0].decay_type(), DecayType::TwoAndOne);
    }

    #[test]
    fn bad_decay_type_aborts_or_skips_per_policy() {
        let body = "5,nonsense,1.0,0,0,0,0,0.511,0,0,0.511\n\
                    6,one,1.0,0,0,0,0,0.511,0,0,0.511\n";

        assert!(load_csv(body, MalformedPolicy::Abort).is_err());

        let events = load_csv(body, MalformedPolicy::Skip).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].decay_type(), DecayType::One);
    }
}
