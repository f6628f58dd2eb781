//! Preference-first paper allocation over a randomized student order.
//!
//! Students are shuffled once. In that order each student takes their
//! highest-ranked paper that is still free; whoever is left afterwards gets a
//! paper drawn uniformly from what remains. The shuffle is the only source of
//! randomness besides the fallback draws, so a fixed seed fixes the outcome.

use crate::error::{Error, Result};
use crate::models::{AssignedPaper, Assignment, PaperPool, StudentPreference};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Allocates one paper per student.
///
/// `seed` makes the run reproducible; without it the order comes from OS
/// entropy. Neither input is modified.
pub fn assign(
    preferences: &[StudentPreference],
    papers: &PaperPool,
    seed: Option<u64>,
) -> Result<Assignment> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    assign_with_rng(preferences, papers, &mut rng)
}

/// Same as [`assign`] with a caller-supplied random source.
///
/// Student ids are expected to be unique; the roster reader enforces this.
pub fn assign_with_rng<R: Rng>(
    preferences: &[StudentPreference],
    papers: &PaperPool,
    rng: &mut R,
) -> Result<Assignment> {
    let mut order: Vec<&StudentPreference> = preferences.iter().collect();
    order.shuffle(rng);
    tracing::debug!(
        "Processing order after shuffling: {:?}",
        order.iter().map(|s| s.id.as_str()).collect::<Vec<_>>()
    );

    let mut available = papers.clone();
    let mut assignment = Assignment::new();

    // Phase 1: first still-available preference, no backtracking
    for student in &order {
        if let Some((rank, paper)) = student
            .ranked()
            .find(|(_, paper)| available.contains(*paper))
        {
            available.remove(paper);
            assignment.insert(
                student.id.clone(),
                AssignedPaper {
                    paper: paper.to_string(),
                    rank: Some(rank),
                },
            );
        }
    }
    tracing::debug!(
        "{} of {} students placed from their preferences",
        assignment.len(),
        order.len()
    );

    // Phase 2: uniform draw from whatever is left, recorded as unranked.
    // Sorted set order keeps seeded draws reproducible.
    let mut remaining: Vec<String> = available.into_iter().collect();
    for student in &order {
        if assignment.contains_key(&student.id) {
            continue;
        }
        if remaining.is_empty() {
            return Err(Error::PoolExhausted {
                student: student.id.to_string(),
                students: preferences.len(),
                papers: papers.len(),
            });
        }
        let index = rng.random_range(0..remaining.len());
        let paper = remaining.swap_remove(index);
        tracing::debug!("Student {} falls back to paper {}", student.id, paper);
        assignment.insert(student.id.clone(), AssignedPaper { paper, rank: None });
    }

    if !remaining.is_empty() {
        tracing::info!("{} papers left unassigned", remaining.len());
    }
    tracing::debug!("The final assignment is: (Stud_ID, [Paper assigned, Pref no.])");
    for (id, assigned) in &assignment {
        tracing::debug!("{}: [{}, {:?}]", id, assigned.paper, assigned.rank_label());
    }
    tracing::info!("Assignment complete");

    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentId;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn student(id: &str, prefs: &[&str]) -> StudentPreference {
        StudentPreference::new(StudentId::parse(id).unwrap(), prefs.iter().copied())
    }

    fn pool(papers: &[&str]) -> PaperPool {
        papers.iter().map(|p| p.to_string()).collect()
    }

    fn lookup<'a>(assignment: &'a Assignment, id: &str) -> &'a AssignedPaper {
        &assignment[&StudentId::parse(id).unwrap()]
    }

    #[test]
    fn test_contested_paper_goes_to_whoever_comes_first() {
        let students = vec![student("1", &["A", "B", "", ""]), student("2", &["A", "", "", ""])];
        let papers = pool(&["A", "B"]);

        let mut two_first = 0;
        let mut one_first = 0;
        for seed in 0..64 {
            let result = assign(&students, &papers, Some(seed)).unwrap();
            let s1 = lookup(&result, "1");
            let s2 = lookup(&result, "2");
            if s2.paper == "A" {
                // 2 went first: 1 falls through to its second choice
                assert_eq!(s2.rank, Some(1));
                assert_eq!(s1.paper, "B");
                assert_eq!(s1.rank_label(), "2");
                two_first += 1;
            } else {
                // 1 went first: 2 has nothing left to prefer
                assert_eq!(s1.paper, "A");
                assert_eq!(s1.rank_label(), "1");
                assert_eq!(s2.paper, "B");
                assert_eq!(s2.rank_label(), "");
                one_first += 1;
            }
        }
        assert!(two_first > 0);
        assert!(one_first > 0);
    }

    #[test]
    fn test_seeded_order_puts_second_student_first() {
        let students = vec![student("1", &["A", "B", "", ""]), student("2", &["A", "", "", ""])];
        let result = assign(&students, &pool(&["A", "B"]), Some(0)).unwrap();

        let rows: Vec<(i64, &str, String)> = result
            .iter()
            .map(|(id, a)| (id.key(), a.paper.as_str(), a.rank_label()))
            .collect();
        assert_eq!(
            rows,
            vec![(1, "B", "2".to_string()), (2, "A", "1".to_string())]
        );
        assert!(result.values().all(|a| !a.is_fallback()));
    }

    #[test]
    fn test_uncontested_first_choices_are_honored() {
        let students = vec![
            student("3", &["C", "A"]),
            student("1", &["A"]),
            student("2", &["B", "C"]),
        ];
        let result = assign(&students, &pool(&["A", "B", "C"]), None).unwrap();
        for (id, paper) in [("1", "A"), ("2", "B"), ("3", "C")] {
            let assigned = lookup(&result, id);
            assert_eq!(assigned.paper, paper);
            assert_eq!(assigned.rank, Some(1));
        }
    }

    #[test]
    fn test_fallback_is_unranked_even_for_unreachable_preference() {
        // Student 2 lists only X, which does not exist; they must land on a
        // leftover paper with an empty rank.
        let students = vec![student("1", &["A"]), student("2", &["X"])];
        let result = assign(&students, &pool(&["A", "B"]), Some(5)).unwrap();
        assert_eq!(lookup(&result, "1").rank, Some(1));
        let fallback = lookup(&result, "2");
        assert_eq!(fallback.paper, "B");
        assert_eq!(fallback.rank_label(), "");
    }

    #[test]
    fn test_no_preferences_uses_fallback_only() {
        let students = vec![student("1", &[]), student("2", &[]), student("3", &[])];
        let papers = pool(&["A", "B", "C"]);
        let result = assign(&students, &papers, Some(11)).unwrap();
        assert!(result.values().all(AssignedPaper::is_fallback));
        let used: HashSet<&str> = result.values().map(|a| a.paper.as_str()).collect();
        assert_eq!(used.len(), 3);
    }

    #[test]
    fn test_pool_exhausted() {
        let students = vec![student("1", &["A"]), student("2", &["A"]), student("3", &[])];
        let err = assign(&students, &pool(&["A", "B"]), Some(1)).unwrap_err();
        match err {
            Error::PoolExhausted { students, papers, .. } => {
                assert_eq!(students, 3);
                assert_eq!(papers, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_surplus_papers_are_left_unused() {
        let students = vec![student("1", &["A"]), student("2", &[])];
        let result = assign(&students, &pool(&["A", "B", "C", "D"]), Some(3)).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(lookup(&result, "1").paper, "A");
        assert!(lookup(&result, "2").is_fallback());
    }

    #[test]
    fn test_same_seed_same_assignment() {
        let students: Vec<_> = (1..=20)
            .map(|i| student(&i.to_string(), &["P1", "P2", "P3"]))
            .collect();
        let papers: PaperPool = (1..=20).map(|i| format!("P{i}")).collect();

        let first = assign(&students, &papers, Some(42)).unwrap();
        let second = assign(&students, &papers, Some(42)).unwrap();
        assert_eq!(first, second);

        let differs = (0..16u64)
            .map(|seed| assign(&students, &papers, Some(seed)).unwrap())
            .any(|other| other != first);
        assert!(differs);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let students = vec![student("2", &["A"]), student("1", &["A"])];
        let papers = pool(&["A", "B"]);
        let before = students.clone();
        assign(&students, &papers, Some(9)).unwrap();
        assert_eq!(students, before);
        assert_eq!(papers.len(), 2);
    }

    #[test]
    fn test_result_is_ordered_by_numeric_id() {
        let students = vec![student("10", &[]), student("9", &[]), student("100", &[])];
        let result = assign(&students, &pool(&["A", "B", "C"]), Some(0)).unwrap();
        let keys: Vec<i64> = result.keys().map(StudentId::key).collect();
        assert_eq!(keys, vec![9, 10, 100]);
    }

    #[test]
    fn test_large_fallback_roster() {
        let n = 50_000;
        let students: Vec<_> = (0..n).map(|i| student(&i.to_string(), &[])).collect();
        let papers: PaperPool = (0..n).map(|p| format!("P{p}")).collect();

        let result = assign(&students, &papers, Some(17)).unwrap();
        assert_eq!(result.len(), n);
        assert!(result.values().all(AssignedPaper::is_fallback));
        let used: HashSet<&str> = result.values().map(|a| a.paper.as_str()).collect();
        assert_eq!(used.len(), n);

        let again = assign(&students, &papers, Some(17)).unwrap();
        assert_eq!(result, again);
    }

    proptest! {
        #[test]
        fn prop_every_student_once_and_no_paper_twice(
            prefs in prop::collection::vec(prop::collection::vec(0u8..12, 0..=4), 1..30),
            surplus in 0usize..5,
            seed in any::<u64>(),
        ) {
            let students: Vec<StudentPreference> = prefs
                .iter()
                .enumerate()
                .map(|(i, ranks)| {
                    let slots: Vec<String> = ranks.iter().map(|r| format!("P{r}")).collect();
                    StudentPreference::new(StudentId::parse(&i.to_string()).unwrap(), slots)
                })
                .collect();
            let papers: PaperPool = (0..students.len() + surplus).map(|p| format!("P{p}")).collect();

            let result = assign(&students, &papers, Some(seed)).unwrap();
            prop_assert_eq!(result.len(), students.len());

            let used: HashSet<&str> = result.values().map(|a| a.paper.as_str()).collect();
            prop_assert_eq!(used.len(), result.len());
            prop_assert!(used.iter().all(|p| papers.contains(*p)));

            for s in &students {
                let assigned = &result[&s.id];
                if let Some(rank) = assigned.rank {
                    let stated = s.ranked().find(|(_, p)| *p == assigned.paper).map(|(r, _)| r);
                    prop_assert_eq!(stated, Some(rank));
                }
            }
            if surplus == 0 {
                prop_assert_eq!(used.len(), papers.len());
            }
        }
    }
}
