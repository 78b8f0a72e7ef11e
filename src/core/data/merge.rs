use std::collections::HashMap;
use std::collections::btree_map::Entry;

use log::{debug, trace};

use super::reshape::reshape;
use crate::catalog::{AccessLevel, FieldCatalog, ProjectCatalogs, RawRecordRow};
use crate::errors::DataFault;
use crate::settings::Settings;
use crate::types::{FieldMap, RenderContext};

/// What a repeating row repeats.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RepeatKey {
    Instrument(String),
    Event,
}

/// The highest instance seen for one repeat key.
#[derive(Debug)]
struct Latest {
    key: RepeatKey,
    instance: u32,
    row: usize,
}

/// Builds the render context for one record from all of its rows.
///
/// Non-repeating values are written first and never overwritten; each
/// repeating instrument (or repeating event) then contributes only its
/// highest-numbered instance. For a longitudinal project this happens per
/// event, and the first event in catalog order is also exposed unqualified.
pub fn merge_record(
    rows: &[RawRecordRow],
    catalogs: &ProjectCatalogs,
    access: AccessLevel,
    settings: &Settings,
) -> Result<RenderContext, DataFault> {
    if rows.is_empty() {
        return Err(DataFault::EmptyRecord);
    }

    let mut context = RenderContext {
        show_label_and_row: settings.show_label_and_row,
        ..Default::default()
    };

    if !catalogs.events.is_longitudinal() {
        let slice: Vec<&RawRecordRow> = rows.iter().collect();
        context.fields = merge_slice(&slice, &catalogs.fields, access, settings)?;
        debug!("Merged {} rows into {} fields", rows.len(), context.fields.len());
        return Ok(context);
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut by_event: Vec<(&str, Vec<&RawRecordRow>)> = Vec::new();
    for row in rows {
        let event = row.event.as_deref().ok_or(DataFault::MissingEvent)?;
        let slot = *index.entry(event).or_insert_with(|| {
            by_event.push((event, Vec::new()));
            by_event.len() - 1
        });
        by_event[slot].1.push(row);
    }
    // catalog order; events the catalog does not know keep arrival order at the end
    by_event.sort_by_key(|(event, _)| catalogs.events.position(event).unwrap_or(usize::MAX));

    for (event, slice) in &by_event {
        let fields = merge_slice(slice, &catalogs.fields, access, settings)?;
        trace!("Event '{}': {} rows, {} fields", event, slice.len(), fields.len());
        context.events.insert(event.to_string(), fields);
    }

    if let Some((first, _)) = by_event.first() {
        context.first_event = Some(first.to_string());
        context.fields = context.events[*first].clone();
    }

    debug!("Merged {} rows over {} events", rows.len(), context.events.len());
    Ok(context)
}

/// Merges the rows of one classical record or one event.
fn merge_slice(
    rows: &[&RawRecordRow],
    fields: &FieldCatalog,
    access: AccessLevel,
    settings: &Settings,
) -> Result<FieldMap, DataFault> {
    let mut latest: Vec<Latest> = Vec::new();
    let mut slots: HashMap<RepeatKey, usize> = HashMap::new();

    for (position, row) in rows.iter().enumerate() {
        let (key, instance) = match (&row.repeat_instrument, row.repeat_instance) {
            (None, None) => continue,
            (Some(instrument), Some(instance)) => {
                (RepeatKey::Instrument(instrument.clone()), instance)
            }
            (Some(instrument), None) => {
                return Err(DataFault::MissingInstance {
                    instrument: instrument.clone(),
                });
            }
            (None, Some(instance)) => (RepeatKey::Event, instance),
        };

        match slots.get(&key) {
            Some(&slot) => {
                if instance > latest[slot].instance {
                    latest[slot].instance = instance;
                    latest[slot].row = position;
                }
            }
            None => {
                slots.insert(key.clone(), latest.len());
                latest.push(Latest {
                    key,
                    instance,
                    row: position,
                });
            }
        }
    }

    let mut merged = FieldMap::new();
    for row in rows
        .iter()
        .filter(|r| r.repeat_instrument.is_none() && r.repeat_instance.is_none())
    {
        merge_into(&mut merged, reshape(row, fields, access, settings), |_| true);
    }

    for entry in &latest {
        trace!("Using instance {} for {:?}", entry.instance, entry.key);
        let values = reshape(rows[entry.row], fields, access, settings);
        match &entry.key {
            RepeatKey::Instrument(instrument) => merge_into(&mut merged, values, |name| {
                fields.instrument_of(name).is_none_or(|owner| owner == instrument)
            }),
            RepeatKey::Event => merge_into(&mut merged, values, |_| true),
        }
    }

    Ok(merged)
}

/// First write wins, except that a blank value yields to a later non-blank one.
fn merge_into(merged: &mut FieldMap, values: FieldMap, keep: impl Fn(&str) -> bool) {
    for (name, value) in values {
        if !keep(&name) {
            continue;
        }
        match merged.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                if slot.get().is_blank() && !value.is_blank() {
                    slot.insert(value);
                }
            }
        }
    }
}
