#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use match_insights::analytics::{
    AdmissionPolicy, AnalyticsSession, Dbn, LotteryNumber, Placement, RankBin, RankBins,
    RankingStrategy, RepositoryError, ResultSnapshot, RunRepository, RunTicket, School,
    SchoolOutcome, SelectionStrategy, Student, StudentId,
};

pub fn lottery(prefix: &str) -> LotteryNumber {
    LotteryNumber::parse(&format!("{prefix}-0000-4000-8000-000000000000"))
        .expect("valid lottery number")
}

pub fn sid(raw: &str) -> StudentId {
    StudentId(raw.to_string())
}

pub fn dbn(raw: &str) -> Dbn {
    Dbn(raw.to_string())
}

/// Assembles a consistent snapshot: bins, matches and school outcomes are all
/// derived from the student placements.
#[derive(Default)]
pub struct SnapshotBuilder {
    students: Vec<(Student, Option<Placement>)>,
    schools: Vec<(School, usize)>,
}

impl SnapshotBuilder {
    pub fn school(mut self, code: &str, policy: AdmissionPolicy, seats: usize) -> Self {
        self.schools.push((
            School {
                dbn: dbn(code),
                policy,
                popularity: 1.0,
                likeability: 0.5,
                name: None,
            },
            seats,
        ));
        self
    }

    pub fn student(
        mut self,
        id: &str,
        lottery_prefix: &str,
        gpa: f64,
        preferences: &[&str],
        matched_rank: Option<u8>,
    ) -> Self {
        let preferences: Vec<Dbn> = preferences.iter().map(|code| dbn(code)).collect();
        let placement = matched_rank.map(|rank| Placement {
            school: preferences[usize::from(rank) - 1].clone(),
            rank: Some(rank),
        });
        self.students.push((
            Student {
                id: sid(id),
                lottery: lottery(lottery_prefix),
                gpa,
                selection: None,
                ranking: None,
                list_length: preferences.len(),
                preferences,
            },
            placement,
        ));
        self
    }

    pub fn strategies(mut self, selection: SelectionStrategy, ranking: RankingStrategy) -> Self {
        let (student, _) = self.students.last_mut().expect("a student to annotate");
        student.selection = Some(selection);
        student.ranking = Some(ranking);
        self
    }

    pub fn build(self) -> ResultSnapshot {
        let mut bins = vec![Vec::new(); RankBin::ordered().len()];
        let mut matches = BTreeMap::new();
        let mut matched: BTreeMap<Dbn, Vec<StudentId>> = BTreeMap::new();
        let mut students = BTreeMap::new();

        for (student, placement) in self.students {
            let bin = RankBin::for_placement(placement.as_ref()).expect("ranked placement");
            bins[bin.index()].push(student.lottery.clone());
            if let Some(placement) = &placement {
                matched
                    .entry(placement.school.clone())
                    .or_default()
                    .push(student.id.clone());
            }
            matches.insert(student.id.clone(), placement);
            students.insert(student.id.clone(), student);
        }

        let mut schools = BTreeMap::new();
        let mut school_outcomes = BTreeMap::new();
        for (school, seats) in self.schools {
            let listed = matched.remove(&school.dbn).unwrap_or_default();
            school_outcomes.insert(
                school.dbn.clone(),
                SchoolOutcome {
                    match_count: listed.len(),
                    matched: listed,
                    total_seats: seats,
                    true_applicants: 0,
                },
            );
            schools.insert(school.dbn.clone(), school);
        }

        ResultSnapshot {
            students,
            schools,
            rank_bins: RankBins::new(bins).expect("thirteen bins"),
            matches,
            school_outcomes,
        }
    }
}

/// Six students across four schools, one of them unmatched.
pub fn district_snapshot() -> ResultSnapshot {
    SnapshotBuilder::default()
        .school("01M001", AdmissionPolicy::Open, 2)
        .school("02M002", AdmissionPolicy::EdOpt, 1)
        .school("03M003", AdmissionPolicy::Screen, 1)
        .school("04M004", AdmissionPolicy::Open, 3)
        .student("s1", "10000000", 3.8, &["01M001", "02M002"], Some(1))
        .strategies(SelectionStrategy::Random, RankingStrategy::Likeability)
        .student("s2", "50000000", 3.0, &["01M001", "03M003"], Some(1))
        .strategies(SelectionStrategy::Popularity, RankingStrategy::Random)
        .student("s3", "30000000", 3.6, &["02M002", "01M001"], Some(1))
        .strategies(SelectionStrategy::Random, RankingStrategy::Likeability)
        .student("s4", "40000000", 2.5, &["01M001", "04M004"], Some(2))
        .student("s5", "05000000", 3.9, &["03M003"], Some(1))
        .student(
            "s6",
            "60000000",
            3.95,
            &["01M001", "02M002", "03M003", "04M004"],
            None,
        )
        .build()
}

#[derive(Default)]
pub struct MemoryRunRepository {
    state: Mutex<(u64, Option<Arc<AnalyticsSession>>)>,
}

impl RunRepository for MemoryRunRepository {
    fn begin(&self) -> Result<RunTicket, RepositoryError> {
        let mut guard = self.state.lock().expect("repository lock");
        guard.0 += 1;
        Ok(RunTicket::new(guard.0))
    }

    fn publish(
        &self,
        ticket: RunTicket,
        session: Arc<AnalyticsSession>,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.state.lock().expect("repository lock");
        if ticket.generation() != guard.0 {
            return Ok(false);
        }
        guard.1 = Some(session);
        Ok(true)
    }

    fn current(&self) -> Result<Option<Arc<AnalyticsSession>>, RepositoryError> {
        Ok(self.state.lock().expect("repository lock").1.clone())
    }
}
