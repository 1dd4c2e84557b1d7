//! Devices installed when the registry is first created.

use twocold_types::{DeviceRecord, Floor};

/// (id, name, place, command index) on the eighth floor.
const EIGHTH_FLOOR: &[(u32, &str, &str, u32)] = &[
    (2, "Александр Вадимович", "D&R", 0),
    (3, "Кирилл", "D&R", 6),
    (4, "Светлана", "Кухня", 12),
    (5, "Оксана", "HR", 18),
    (6, "Камчатка", "Камчатка", 24),
    (7, "Данил", "Core", 30),
    (8, "Artöm", "CoreNavi", 36),
    (9, "Юля", "Support", 42),
    (10, "Даша", "iOS", 48),
    (11, "Маша", "iOS", 54),
    (12, "Вадим", "iOS", 60),
    (13, "Руслан", "Android", 66),
    (14, "Сергей", "Android", 72),
    (15, "Мария", "Reception", 78),
];

/// (id, name, place, command index) on the fifth floor.
const FIFTH_FLOOR: &[(u32, &str, &str, u32)] = &[
    (10, "Юра", "Unix", 48),
    (11, "Евгений", "Кухня", 54),
    (12, "Анатолий", "Карта", 60),
    (14, "Стёпа", "Карта", 72),
];

/// The seed set: floor 8 first, then floor 5.
pub fn default_records() -> Vec<DeviceRecord> {
    let mut records = rows(Floor::Eighth, EIGHTH_FLOOR);
    records.extend(rows(Floor::Fifth, FIFTH_FLOOR));
    records
}

fn rows(floor: Floor, rows: &[(u32, &str, &str, u32)]) -> Vec<DeviceRecord> {
    rows.iter()
        .map(|&(id, name, place, command_index)| {
            DeviceRecord::new(floor, id, name, place, command_index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_counts() {
        let records = default_records();
        assert_eq!(records.iter().filter(|r| r.floor == Floor::Eighth).count(), 14);
        assert_eq!(records.iter().filter(|r| r.floor == Floor::Fifth).count(), 4);
    }

    #[test]
    fn test_defaults_are_unique_and_valid() {
        let records = default_records();
        let keys: HashSet<_> = records.iter().map(|r| (r.floor, r.id)).collect();
        assert_eq!(keys.len(), records.len());

        for record in &records {
            let edit = twocold_types::DeviceEdit::new(record.name.clone(), record.place.clone());
            assert!(edit.validate().is_ok(), "{:?}", record);
        }
    }

    #[test]
    fn test_command_indices_follow_ids() {
        // Controls sit six positions apart on the device list
        for record in default_records() {
            assert_eq!(record.command_index, (record.id - 2) * 6);
        }
    }
}
