//! Problem reports: rider submission and admin triage

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        bike::BikePatch,
        problem::{NewProblem, Problem, ProblemPatch, ProblemStatus, ProblemTriage, SubmitReport},
        user::UserClaims,
    },
    repository::Repository,
    ride::{format_date, Clock},
};

#[derive(Clone)]
pub struct ProblemsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

/// Parse a bike number typed by the rider
fn parse_bike_id(raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::Validation(
            "Bike number must be a positive integer".to_string(),
        )),
    }
}

impl ProblemsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// File a new report for the signed-in rider.
    ///
    /// The reporter is named after the account's current username, which may
    /// differ from the one the session token was issued for.
    pub async fn submit_report(&self, report: SubmitReport, claims: &UserClaims) -> AppResult<Problem> {
        let bike_id = parse_bike_id(&report.bike_id)?;
        let opis = report.opis.trim();
        if opis.is_empty() {
            return Err(AppError::Validation("Problem description is required".to_string()));
        }
        let reporter = self.repository.get_user(claims.user_id).await?;

        let problem = NewProblem {
            datum: format_date(&self.clock.now()),
            korisnik: reporter.username,
            bike_id,
            opis: opis.to_string(),
            fotografija: report
                .fotografija
                .map(|f| f.trim().to_string())
                .unwrap_or_default(),
            status: ProblemStatus::New,
            user_id: Some(claims.user_id),
        };
        let created = self.repository.create_problem(&problem).await?;
        tracing::info!(
            problem_id = created.id,
            bike_id,
            korisnik = %created.korisnik,
            "Problem reported"
        );
        Ok(created)
    }

    pub async fn list_problems(&self) -> AppResult<Vec<Problem>> {
        self.repository.list_problems().await
    }

    /// Triage a report and cascade the decision onto its bike.
    ///
    /// The cascade runs only after the report is updated; a failed cascade is
    /// logged and reported, the report keeps its new status.
    pub async fn update_problem_status(
        &self,
        problem_id: i64,
        status: ProblemStatus,
    ) -> AppResult<ProblemTriage> {
        let current = self.repository.get_problem(problem_id).await?;
        if !current.status.can_transition_to(status) {
            return Err(AppError::BusinessRule(format!(
                "Problem #{} is already '{}' and cannot move to '{}'",
                problem_id, current.status, status
            )));
        }

        let problem = self
            .repository
            .update_problem(problem_id, &ProblemPatch { status })
            .await?;

        let bike_status = status.cascaded_bike_status();
        let cascade_applied = match bike_status {
            Some(bike_status) => match self
                .repository
                .update_bike(problem.bike_id, &BikePatch::status(bike_status))
                .await
            {
                Ok(_) => {
                    tracing::info!(
                        problem_id,
                        bike_id = problem.bike_id,
                        bike_status = %bike_status,
                        "Problem triage applied to bike"
                    );
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        problem_id,
                        bike_id = problem.bike_id,
                        "Failed to set bike status to '{}': {}",
                        bike_status,
                        e
                    );
                    false
                }
            },
            None => true,
        };

        Ok(ProblemTriage {
            problem,
            bike_status,
            cascade_applied,
        })
    }

    pub async fn delete_problem(&self, problem_id: i64) -> AppResult<()> {
        self.repository.delete_problem(problem_id).await?;
        tracing::info!(problem_id, "Problem deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            bike::BikeStatus,
            user::{Role, User},
        },
        repository::MockStore,
        ride::ManualClock,
    };

    fn claims() -> UserClaims {
        UserClaims {
            sub: "ana".to_string(),
            user_id: 2,
            role: Role::User,
            exp: 0,
            iat: 0,
        }
    }

    fn account(username: &str) -> User {
        User {
            id: 2,
            username: username.to_string(),
            password: "ana123".to_string(),
            role: Role::User,
            ime: Some("Ana".to_string()),
            prezime: None,
            telefon: None,
            email: None,
        }
    }

    fn service(store: MockStore) -> ProblemsService {
        ProblemsService::new(Arc::new(store), Arc::new(ManualClock::default()))
    }

    fn stored(status: ProblemStatus) -> Problem {
        Problem {
            id: 9,
            datum: "12.01.2026.".to_string(),
            korisnik: "ana".to_string(),
            bike_id: 42,
            opis: "Kočnica ne radi".to_string(),
            fotografija: String::new(),
            status,
            user_id: Some(2),
        }
    }

    fn report(bike_id: &str, opis: &str) -> SubmitReport {
        SubmitReport {
            bike_id: bike_id.to_string(),
            opis: opis.to_string(),
            fotografija: None,
        }
    }

    #[tokio::test]
    async fn test_submit_creates_new_report() {
        let mut store = MockStore::new();
        store.expect_get_user().returning(|_| Ok(account("ana")));
        store
            .expect_create_problem()
            .withf(|p| p.status == ProblemStatus::New && p.bike_id == 42 && p.korisnik == "ana")
            .times(1)
            .returning(|p| Ok(p.clone().into_problem(1)));

        let problem = service(store)
            .submit_report(report(" 42 ", "  Lanac spao "), &claims())
            .await
            .unwrap();
        assert_eq!(problem.status, ProblemStatus::New);
        assert_eq!(problem.opis, "Lanac spao");
        assert_eq!(problem.user_id, Some(2));
    }

    #[tokio::test]
    async fn test_invalid_reports_never_reach_the_store() {
        let mut store = MockStore::new();
        store.expect_get_user().never();
        store.expect_create_problem().never();
        let service = service(store);

        for (bike_id, opis) in [("0", "Guma"), ("", "Guma"), ("abc", "Guma"), ("-3", "Guma"), ("42", "   ")] {
            let err = service
                .submit_report(report(bike_id, opis), &claims())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{} / {}", bike_id, opis);
        }
    }

    #[tokio::test]
    async fn test_report_uses_current_username() {
        let mut store = MockStore::new();
        store
            .expect_get_user()
            .withf(|id| *id == 2)
            .returning(|_| Ok(account("ana2")));
        store
            .expect_create_problem()
            .withf(|p| p.korisnik == "ana2" && p.user_id == Some(2))
            .times(1)
            .returning(|p| Ok(p.clone().into_problem(4)));

        let problem = service(store)
            .submit_report(report("42", "Zvono ne radi"), &claims())
            .await
            .unwrap();
        assert_eq!(problem.korisnik, "ana2");
    }

    async fn triage(target: ProblemStatus, expected_bike_status: BikeStatus, bike_write_ok: bool) {
        let mut store = MockStore::new();
        store
            .expect_get_problem()
            .returning(|_| Ok(stored(ProblemStatus::New)));
        store
            .expect_update_problem()
            .times(1)
            .returning(move |_, patch| Ok(stored(patch.status)));
        store
            .expect_update_bike()
            .withf(move |id, patch| *id == 42 && *patch == BikePatch::status(expected_bike_status))
            .times(1)
            .returning(move |id, patch| {
                if bike_write_ok {
                    let mut bike = crate::models::bike::Bike {
                        id,
                        tip: "Gradski".to_string(),
                        cena: 10,
                        status: BikeStatus::Available,
                        latitude: None,
                        longitude: None,
                        baterija: Some(0),
                        adresa: None,
                        slika: None,
                    };
                    patch.apply(&mut bike);
                    Ok(bike)
                } else {
                    Err(AppError::Store("503 Service Unavailable".to_string()))
                }
            });

        let outcome = service(store).update_problem_status(9, target).await.unwrap();
        assert_eq!(outcome.problem.status, target);
        assert_eq!(outcome.bike_status, Some(expected_bike_status));
        assert_eq!(outcome.cascade_applied, bike_write_ok);
    }

    #[tokio::test]
    async fn test_maintenance_cascades_once() {
        triage(ProblemStatus::SentToMaintenance, BikeStatus::Maintenance, true).await;
    }

    #[tokio::test]
    async fn test_exclusion_cascades_once() {
        triage(ProblemStatus::Excluded, BikeStatus::Broken, true).await;
    }

    #[tokio::test]
    async fn test_failed_cascade_keeps_the_new_status() {
        triage(ProblemStatus::Excluded, BikeStatus::Broken, false).await;
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let mut store = MockStore::new();
        store
            .expect_get_problem()
            .returning(|_| Ok(stored(ProblemStatus::Excluded)));
        store.expect_update_problem().never();
        store.expect_update_bike().never();

        let err = service(store)
            .update_problem_status(9, ProblemStatus::SentToMaintenance)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }
}
