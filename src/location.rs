use crate::models::Landmark;

/// Hardcoded Karachi landmarks offered by the map's search box.
pub const LANDMARKS: [Landmark; 4] = [
    Landmark { name: "Clifton Beach", lat: 24.7796, lng: 67.0278 },
    Landmark { name: "Frere Hall", lat: 24.8567, lng: 67.0297 },
    Landmark { name: "Mohatta Palace", lat: 24.8193, lng: 67.0363 },
    Landmark { name: "Quaid's Mausoleum", lat: 24.8636, lng: 67.0311 },
];

/// Case-insensitive substring match on landmark names; a blank query returns all.
pub fn search(query: Option<&str>) -> Vec<Landmark> {
    let needle = match query.map(str::trim) {
        Some(q) if !q.is_empty() => q.to_lowercase(),
        _ => return LANDMARKS.to_vec(),
    };
    LANDMARKS
        .iter()
        .filter(|landmark| landmark.name.to_lowercase().contains(&needle))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_returns_every_landmark() {
        assert_eq!(search(None), LANDMARKS.to_vec());
        assert_eq!(search(Some("")), LANDMARKS.to_vec());
        assert_eq!(search(Some("   ")), LANDMARKS.to_vec());
    }

    #[test]
    fn matches_case_insensitive_substrings() {
        let names: Vec<_> = search(Some("HALL")).into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Frere Hall"]);

        let names: Vec<_> = search(Some("a")).into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Clifton Beach", "Frere Hall", "Mohatta Palace", "Quaid's Mausoleum"]);
    }

    #[test]
    fn unmatched_query_returns_nothing() {
        assert!(search(Some("Lahore Fort")).is_empty());
    }
}
