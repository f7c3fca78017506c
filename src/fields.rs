/// Activity fields that can be changed with `update --set`, and lookup/suggestion logic

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  /// Free-form string
  Text,
  /// true/false/1/0
  Flag,
}

#[derive(Debug, Clone)]
pub struct UpdateField {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub kind: FieldKind,
  pub description: &'static str,
}

/// All updatable fields
pub const UPDATE_FIELDS: &[UpdateField] = &[
  UpdateField {
    name: "name",
    aliases: &["title"],
    kind: FieldKind::Text,
    description: "Activity name",
  },
  UpdateField {
    name: "sport_type",
    aliases: &["sport"],
    kind: FieldKind::Text,
    description: "Sport type (e.g. MountainBikeRide)",
  },
  UpdateField {
    name: "type",
    aliases: &["activity_type"],
    kind: FieldKind::Text,
    description: "Legacy activity type (e.g. Ride)",
  },
  UpdateField {
    name: "description",
    aliases: &["desc"],
    kind: FieldKind::Text,
    description: "Activity description",
  },
  UpdateField {
    name: "trainer",
    aliases: &["indoor"],
    kind: FieldKind::Flag,
    description: "Recorded on a trainer",
  },
  UpdateField {
    name: "commute",
    aliases: &[],
    kind: FieldKind::Flag,
    description: "Mark as commute",
  },
  UpdateField {
    name: "hide_from_home",
    aliases: &["hide", "muted"],
    kind: FieldKind::Flag,
    description: "Hide from home feeds",
  },
  UpdateField {
    name: "gear_id",
    aliases: &["gear"],
    kind: FieldKind::Text,
    description: "Bike or shoe id, 'none' to clear",
  },
];

/// Find a field by exact name or alias
pub fn lookup(key: &str) -> Option<&'static UpdateField> {
  let key = key.trim().to_lowercase();
  UPDATE_FIELDS
    .iter()
    .find(|f| f.name == key || f.aliases.contains(&key.as_str()))
}

/// Get suggestions for a (possibly misspelled) field name
pub fn get_suggestions(input: &str) -> Vec<&'static UpdateField> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return UPDATE_FIELDS.iter().collect();
  }

  let mut matches: Vec<(&UpdateField, u32)> = Vec::new();

  for field in UPDATE_FIELDS {
    if field.name == input_lower {
      matches.push((field, 0));
      continue;
    }

    if field.aliases.contains(&input_lower.as_str()) {
      matches.push((field, 1));
      continue;
    }

    if field.name.starts_with(&input_lower) {
      matches.push((field, 2));
      continue;
    }

    if field.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((field, 3));
      continue;
    }

    // Misspelled with extra characters, e.g. "names"
    if input_lower.starts_with(field.name) {
      matches.push((field, 4));
      continue;
    }

    if field.name.contains(&input_lower) {
      matches.push((field, 5));
      continue;
    }

    if field.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((field, 6));
    }
  }

  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(field, _)| field).collect()
}
