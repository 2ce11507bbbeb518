//! Aggregator service for computing per-category provider rankings

use crate::types::{
    CategoryRanking, JoinedRecord, ProviderScore, Rankings, RecordId, SourceData,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Joins the four source collections and ranks providers per category
pub struct Aggregator;

impl Aggregator {
    /// Rebuild (category, provider, value) rows.
    ///
    /// Appointment ⋈ link on patient_id, ⋈ rating on appointment_id,
    /// ⋈ provider on provider_id. Exact duplicate rows collapse; a patient
    /// linked to several providers expands to one row per link. Several
    /// ratings of one appointment are averaged into a single value first.
    /// Rows without a partner in any join are dropped.
    pub fn join(data: &SourceData) -> Vec<JoinedRecord> {
        // appointment_id -> (sum, count)
        let mut rating_sums: HashMap<&RecordId, (f64, u32)> = HashMap::new();
        for rating in &data.ratings {
            let slot = rating_sums.entry(&rating.appointment_id).or_insert((0.0, 0));
            slot.0 += rating.value;
            slot.1 += 1;
        }

        let mut providers_by_patient: HashMap<&RecordId, Vec<&RecordId>> = HashMap::new();
        let mut seen_links = HashSet::new();
        for link in &data.links {
            if seen_links.insert(link) {
                providers_by_patient
                    .entry(&link.patient_id)
                    .or_default()
                    .push(&link.provider_id);
            }
        }

        let mut categories_by_provider: HashMap<&RecordId, Vec<&str>> = HashMap::new();
        let mut seen_providers = HashSet::new();
        for provider in &data.providers {
            if seen_providers.insert(provider) {
                categories_by_provider
                    .entry(&provider.provider_id)
                    .or_default()
                    .push(provider.category.as_str());
            }
        }

        let mut joined = Vec::new();
        let mut unrated = 0usize;
        let mut unlinked = 0usize;
        let mut unknown_providers = 0usize;
        let mut seen_appointments = HashSet::new();

        for appointment in &data.appointments {
            if !seen_appointments.insert(appointment) {
                continue;
            }
            let Some(&(sum, count)) = rating_sums.get(&appointment.appointment_id) else {
                unrated += 1;
                continue;
            };
            let Some(provider_ids) = providers_by_patient.get(&appointment.patient_id) else {
                unlinked += 1;
                continue;
            };
            let value = sum / f64::from(count);

            for provider_id in provider_ids {
                let Some(categories) = categories_by_provider.get(provider_id) else {
                    unknown_providers += 1;
                    continue;
                };
                for category in categories {
                    joined.push(JoinedRecord {
                        category: (*category).to_string(),
                        provider_id: (*provider_id).clone(),
                        value,
                    });
                }
            }
        }

        tracing::debug!(
            joined = joined.len(),
            unrated,
            unlinked,
            unknown_providers,
            "join finished"
        );
        joined
    }

    /// Group joined rows by category then provider, average, and sort.
    ///
    /// Every category in `categories` gets an entry, empty if nobody in it
    /// was scored.
    pub fn rank<'a>(
        categories: impl IntoIterator<Item = &'a str>,
        joined: &[JoinedRecord],
    ) -> Rankings {
        let mut groups: BTreeMap<&str, HashMap<&RecordId, (f64, u32)>> = BTreeMap::new();
        for category in categories {
            groups.entry(category).or_default();
        }

        for record in joined {
            let slot = groups
                .entry(record.category.as_str())
                .or_default()
                .entry(&record.provider_id)
                .or_insert((0.0, 0));
            slot.0 += record.value;
            slot.1 += 1;
        }

        groups
            .into_iter()
            .map(|(category, providers)| {
                let scores = providers
                    .into_iter()
                    .map(|(provider_id, (sum, count))| ProviderScore {
                        provider_id: provider_id.clone(),
                        average_value: sum / f64::from(count),
                    })
                    .collect();
                (category.to_string(), CategoryRanking::from_scores(scores))
            })
            .collect()
    }

    /// Join and rank in one step
    pub fn aggregate(data: &SourceData) -> Rankings {
        let joined = Self::join(data);
        Self::rank(data.providers.iter().map(|p| p.category.as_str()), &joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Appointment, PatientProviderLink, Provider, Rating};

    fn appt(id: i64, patient: &str) -> Appointment {
        Appointment {
            appointment_id: RecordId::Int(id),
            patient_id: RecordId::from(patient),
        }
    }

    fn link(patient: &str, provider: &str) -> PatientProviderLink {
        PatientProviderLink {
            patient_id: RecordId::from(patient),
            provider_id: RecordId::from(provider),
        }
    }

    fn rating(appointment: i64, value: f64) -> Rating {
        Rating {
            appointment_id: RecordId::Int(appointment),
            value,
        }
    }

    fn provider(id: &str, category: &str) -> Provider {
        Provider {
            provider_id: RecordId::from(id),
            category: category.to_string(),
        }
    }

    fn ids(ranking: &CategoryRanking) -> Vec<String> {
        ranking
            .entries()
            .iter()
            .map(|s| s.provider_id.to_string())
            .collect()
    }

    fn assert_well_formed(rankings: &Rankings) {
        for ranking in rankings.values() {
            let entries = ranking.entries();
            for pair in entries.windows(2) {
                assert!(pair[0].average_value >= pair[1].average_value);
            }
            let unique: HashSet<&RecordId> = entries.iter().map(|s| &s.provider_id).collect();
            assert_eq!(unique.len(), entries.len());
        }
    }

    #[test]
    fn test_two_providers_one_category() {
        let data = SourceData {
            appointments: vec![appt(1, "p1"), appt(2, "p2")],
            links: vec![link("p1", "c1"), link("p2", "c2")],
            ratings: vec![rating(1, 4.0), rating(2, 5.0)],
            providers: vec![provider("c1", "cardiology"), provider("c2", "cardiology")],
        };

        let rankings = Aggregator::aggregate(&data);

        let cardiology = &rankings["cardiology"];
        assert_eq!(ids(cardiology), vec!["c2", "c1"]);
        assert_eq!(cardiology.entries()[0].average_value, 5.0);
        assert_eq!(cardiology.entries()[1].average_value, 4.0);
    }

    #[test]
    fn test_average_of_two_ratings_is_exact() {
        let data = SourceData {
            appointments: vec![appt(1, "p1"), appt(2, "p1")],
            links: vec![link("p1", "c1")],
            ratings: vec![rating(1, 3.0), rating(2, 5.0)],
            providers: vec![provider("c1", "grief")],
        };

        let rankings = Aggregator::aggregate(&data);

        assert_eq!(rankings["grief"].entries()[0].average_value, 4.0);
    }

    #[test]
    fn test_unrated_appointments_are_dropped_not_zeroed() {
        let data = SourceData {
            appointments: vec![appt(1, "p1"), appt(2, "p1")],
            links: vec![link("p1", "c1")],
            ratings: vec![rating(1, 5.0)],
            providers: vec![provider("c1", "grief")],
        };

        let rankings = Aggregator::aggregate(&data);

        assert_eq!(rankings["grief"].entries()[0].average_value, 5.0);
    }

    #[test]
    fn test_patient_with_several_providers_expands() {
        let data = SourceData {
            appointments: vec![appt(1, "p1")],
            links: vec![link("p1", "c1"), link("p1", "c2")],
            ratings: vec![rating(1, 4.0)],
            providers: vec![provider("c1", "family"), provider("c2", "family")],
        };

        let joined = Aggregator::join(&data);
        assert_eq!(joined.len(), 2);

        let rankings = Aggregator::aggregate(&data);
        assert_eq!(ids(&rankings["family"]), vec!["c1", "c2"]);
    }

    #[test]
    fn test_duplicate_rows_collapse() {
        let data = SourceData {
            appointments: vec![appt(1, "p1"), appt(1, "p1"), appt(2, "p2")],
            links: vec![link("p1", "c1"), link("p1", "c1"), link("p2", "c1")],
            ratings: vec![rating(1, 2.0), rating(2, 4.0)],
            providers: vec![provider("c1", "family"), provider("c1", "family")],
        };

        let joined = Aggregator::join(&data);
        assert_eq!(joined.len(), 2);
        assert_eq!(
            Aggregator::aggregate(&data)["family"].entries()[0].average_value,
            3.0
        );
    }

    #[test]
    fn test_duplicate_ratings_averaged_per_appointment() {
        // Appointment 1 has two ratings (2.0, 4.0) -> counts once as 3.0
        let data = SourceData {
            appointments: vec![appt(1, "p1"), appt(2, "p1")],
            links: vec![link("p1", "c1")],
            ratings: vec![rating(1, 2.0), rating(1, 4.0), rating(2, 5.0)],
            providers: vec![provider("c1", "family")],
        };

        let rankings = Aggregator::aggregate(&data);

        assert_eq!(rankings["family"].entries()[0].average_value, 4.0);
    }

    #[test]
    fn test_category_without_scores_is_empty_not_missing() {
        let data = SourceData {
            appointments: vec![appt(1, "p1")],
            links: vec![link("p1", "c1")],
            ratings: vec![rating(1, 4.0)],
            providers: vec![provider("c1", "family"), provider("c9", "addiction")],
        };

        let rankings = Aggregator::aggregate(&data);

        assert_eq!(rankings.len(), 2);
        assert!(rankings["addiction"].is_empty());
        assert_eq!(rankings["family"].len(), 1);
    }

    #[test]
    fn test_unknown_provider_dropped() {
        let data = SourceData {
            appointments: vec![appt(1, "p1")],
            links: vec![link("p1", "ghost")],
            ratings: vec![rating(1, 4.0)],
            providers: vec![provider("c1", "family")],
        };

        assert!(Aggregator::join(&data).is_empty());
        assert!(Aggregator::aggregate(&data)["family"].is_empty());
    }

    #[test]
    fn test_providers_stay_in_their_category() {
        let data = SourceData {
            appointments: vec![appt(1, "p1"), appt(2, "p2"), appt(3, "p3")],
            links: vec![link("p1", "a"), link("p2", "b"), link("p3", "c")],
            ratings: vec![rating(1, 1.0), rating(2, 2.0), rating(3, 3.0)],
            providers: vec![
                provider("a", "family"),
                provider("b", "grief"),
                provider("c", "family"),
            ],
        };

        let rankings = Aggregator::aggregate(&data);

        assert_eq!(ids(&rankings["family"]), vec!["c", "a"]);
        assert_eq!(ids(&rankings["grief"]), vec!["b"]);
        assert_well_formed(&rankings);
    }

    #[test]
    fn test_ties_are_deterministic() {
        let data = SourceData {
            appointments: vec![appt(1, "p1"), appt(2, "p2"), appt(3, "p3")],
            links: vec![link("p1", "z"), link("p2", "m"), link("p3", "a")],
            ratings: vec![rating(1, 5.0), rating(2, 5.0), rating(3, 5.0)],
            providers: vec![
                provider("z", "family"),
                provider("m", "family"),
                provider("a", "family"),
            ],
        };

        let first = Aggregator::aggregate(&data);
        let second = Aggregator::aggregate(&data);

        assert_eq!(ids(&first["family"]), vec!["a", "m", "z"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_larger_dataset_is_well_formed() {
        let mut data = SourceData::default();
        for i in 0..200i64 {
            let patient = format!("p{}", i % 37);
            let prov = format!("c{}", i % 11);
            data.appointments.push(Appointment {
                appointment_id: RecordId::Int(i),
                patient_id: RecordId::Text(patient.clone()),
            });
            data.links.push(PatientProviderLink {
                patient_id: RecordId::Text(patient),
                provider_id: RecordId::Text(prov),
            });
            if i % 3 != 0 {
                data.ratings.push(rating(i, (i % 5) as f64 + 1.0));
            }
        }
        for c in 0..11 {
            let category = if c % 2 == 0 { "even" } else { "odd" };
            data.providers.push(provider(&format!("c{}", c), category));
        }

        let rankings = Aggregator::aggregate(&data);

        assert_eq!(rankings.len(), 2);
        assert_well_formed(&rankings);
    }

    #[test]
    fn test_empty_input() {
        assert!(Aggregator::aggregate(&SourceData::default()).is_empty());
    }
}
