// tests/matching_scenarios.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use matching_backend::{
    config::{AppState, Collaborators, Repositories},
    db::memory::InMemoryStore,
    models::{
        notification::EventTrigger,
        project::{FinishOutcome, ProjectProgress},
        user::UserRole,
    },
    services::{interest::InterestMode, matching::MatchRequest, triggers::NotificationSettings},
    testing::{RecordingMailer, RecordingMessageSink, StaticInviteIssuer},
};

struct Scenario {
    store: Arc<InMemoryStore>,
    mailer: Arc<RecordingMailer>,
    app: AppState,
}

fn scenario() -> Scenario {
    let store = Arc::new(InMemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let app = AppState::from_parts(
        Repositories::in_memory(store.clone()),
        Collaborators {
            mailer: mailer.clone(),
            invites: Arc::new(StaticInviteIssuer::new()),
            messages: Arc::new(RecordingMessageSink::new()),
        },
        NotificationSettings {
            base_url: Url::parse("https://bygg.example").unwrap(),
            admin_emails: vec!["ops@bygg.example".to_string()],
            concurrency: 4,
            dispatch_timeout: Duration::from_secs(1),
        },
    );
    Scenario { store, mailer, app }
}

#[tokio::test]
async fn broadcast_match_picks_only_category_and_area_match() {
    let s = scenario();
    let plumbing = s.store.add_category("plumbing");
    let electrical = s.store.add_category("electrical");
    let stockholm = s.store.add_city("Stockholm");
    let uppsala = s.store.add_city("Uppsala");
    let zip_0180 = s.store.add_zip_code("0180", stockholm, &[], &[]);
    s.store.add_zip_code("7510", uppsala, &[], &[]);

    let a = s.store.add_company("A", Some("a@a.se"), &[plumbing]);
    let b = s.store.add_company("B", Some("b@b.se"), &[electrical]);
    let c = s.store.add_company("C", Some("c@c.se"), &[plumbing]);
    s.store.serve_cities(a, &[stockholm]);
    s.store.serve_cities(b, &[stockholm]);
    s.store.serve_cities(c, &[uppsala]);

    let p = s
        .store
        .add_project("P", Some(plumbing), Some(zip_0180), ProjectProgress::Moderated);

    let report = s
        .app
        .match_service
        .match_project(p, MatchRequest::default())
        .await
        .unwrap();

    assert_eq!(report.matched, vec![a]);
    assert_eq!(s.mailer.recipients(), vec!["a@a.se"]);
    assert_eq!(report.send_requests_created, 0);
}

#[tokio::test]
async fn broadcast_never_reaches_blacklisted_companies() {
    let s = scenario();
    let plumbing = s.store.add_category("plumbing");
    let city = s.store.add_city("Stockholm");
    let zip = s.store.add_zip_code("0180", city, &[], &[]);

    let kept = s.store.add_company("Kept", Some("kept@x.se"), &[plumbing]);
    let banned = s.store.add_company("Banned", Some("banned@x.se"), &[plumbing]);
    s.store.serve_cities(kept, &[city]);
    s.store.serve_cities(banned, &[city]);

    let p = s
        .store
        .add_project("P", Some(plumbing), Some(zip), ProjectProgress::Moderated);
    s.store.reject(p, banned);

    let report = s
        .app
        .match_service
        .match_project(p, MatchRequest::default())
        .await
        .unwrap();
    assert_eq!(report.matched, vec![kept]);
}

#[tokio::test]
async fn directed_send_is_idempotent_and_bypasses_filters() {
    let s = scenario();
    let plumbing = s.store.add_category("plumbing");
    let p = s
        .store
        .add_project("P", Some(plumbing), None, ProjectProgress::Moderated);

    // Nenhuma das duas atende a categoria nem a região do projeto
    let x = s.store.add_company("X", Some("x@x.se"), &[]);
    let y = s.store.add_company("Y", Some("y@y.se"), &[]);
    s.store.add_member(y, "Ylva", "ylva@y.se", UserRole::CompanyAdmin);

    let first = s
        .app
        .match_service
        .match_project(p, MatchRequest::directed(vec![x, y]))
        .await
        .unwrap();
    assert_eq!(first.send_requests_created, 2);
    assert_eq!(first.with_members, 1);
    assert_eq!(first.admin_only, 1);

    let second = s
        .app
        .match_service
        .match_project(p, MatchRequest::directed(vec![y, x, x]))
        .await
        .unwrap();
    assert_eq!(second.send_requests_created, 0);

    let pairs: HashSet<(Uuid, Uuid)> = s
        .store
        .send_requests()
        .iter()
        .map(|r| (r.company_id, r.project_id))
        .collect();
    assert_eq!(s.store.send_requests().len(), 2);
    assert_eq!(pairs, HashSet::from([(x, p), (y, p)]));
}

#[tokio::test]
async fn earlier_directed_offer_lets_a_company_see_the_project_outside_its_area() {
    let s = scenario();
    let plumbing = s.store.add_category("plumbing");
    let stockholm = s.store.add_city("Stockholm");
    let zip = s.store.add_zip_code("0180", stockholm, &[], &[]);
    let far = s.store.add_company("Far", Some("far@x.se"), &[plumbing]);

    let p = s
        .store
        .add_project("P", Some(plumbing), Some(zip), ProjectProgress::Moderated);

    let feed = s
        .app
        .request_service
        .company_requests(far, Default::default())
        .await
        .unwrap();
    assert!(feed.is_empty());

    s.app
        .match_service
        .match_project(p, MatchRequest::directed(vec![far]))
        .await
        .unwrap();

    let feed = s
        .app
        .request_service
        .company_requests(far, Default::default())
        .await
        .unwrap();
    assert_eq!(feed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![p]);
}

#[tokio::test]
async fn interested_only_match_without_interest_notifies_nobody() {
    let s = scenario();
    let plumbing = s.store.add_category("plumbing");
    let city = s.store.add_city("Stockholm");
    let zip = s.store.add_zip_code("0180", city, &[], &[]);
    let a = s.store.add_company("A", Some("a@a.se"), &[plumbing]);
    s.store.serve_cities(a, &[city]);

    let p = s
        .store
        .add_project("P", Some(plumbing), Some(zip), ProjectProgress::Moderated);

    let request = MatchRequest {
        interest: InterestMode::InterestedOnly,
        ..MatchRequest::default()
    };
    let report = s
        .app
        .match_service
        .match_project(p, request.clone())
        .await
        .unwrap();
    assert!(report.matched.is_empty());
    assert!(s.mailer.sent().is_empty());

    s.app.request_service.show_interest(p, a).await.unwrap();
    let report = s.app.match_service.match_project(p, request).await.unwrap();
    assert_eq!(report.matched, vec![a]);
}

#[tokio::test]
async fn finish_needs_both_sides_in_any_order() {
    let s = scenario();
    let customer = s.store.add_customer("Kund", "kund@example.se");
    let company = s.store.add_company("Alfa", Some("alfa@ror.se"), &[]);

    let mut finished_at = Vec::new();
    for company_first in [true, false] {
        let p = s.store.add_project("P", None, None, ProjectProgress::Active);
        s.store.set_customer(p, customer);
        s.store.assign_company(p, company);

        let finish = &s.app.finish_service;
        let (first, second) = if company_first {
            (
                finish.confirm_finish_by_company(p).await.unwrap(),
                finish.confirm_finish_by_customer(p).await.unwrap(),
            )
        } else {
            (
                finish.confirm_finish_by_customer(p).await.unwrap(),
                finish.confirm_finish_by_company(p).await.unwrap(),
            )
        };

        assert_eq!(first.outcome, FinishOutcome::AwaitingCounterpart);
        assert_eq!(second.outcome, FinishOutcome::Finished);
        assert_eq!(second.state.progress, ProjectProgress::Finished);
        assert!(second.state.company_confirmed && second.state.customer_confirmed);

        let repeat = finish.confirm_finish_by_company(p).await.unwrap();
        assert_eq!(repeat.state.finished_at, second.state.finished_at);
        finished_at.push(second.state.finished_at);
    }

    assert!(finished_at.iter().all(Option::is_some));
    // A repetição da empresa não gera um segundo aviso
    assert_eq!(s.mailer.sent_with(EventTrigger::CompanyMarkedFinish).len(), 2);
    assert_eq!(s.mailer.sent_with(EventTrigger::CustomerMarkedFinish).len(), 2);
}

#[tokio::test]
async fn concurrent_confirmations_finish_exactly_once() {
    let s = scenario();
    let p = s.store.add_project("P", None, None, ProjectProgress::Active);

    let finish = s.app.finish_service.clone();
    let (company, customer) = tokio::join!(
        finish.confirm_finish_by_company(p),
        finish.confirm_finish_by_customer(p)
    );
    let outcomes = [company.unwrap().outcome, customer.unwrap().outcome];

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == FinishOutcome::Finished)
            .count(),
        1
    );
    assert!(outcomes.contains(&FinishOutcome::AwaitingCounterpart));
}

#[tokio::test]
async fn moderation_broadcasts_and_start_enables_finish() {
    let s = scenario();
    let plumbing = s.store.add_category("plumbing");
    let city = s.store.add_city("Stockholm");
    let zip = s.store.add_zip_code("0180", city, &[], &[]);
    let a = s.store.add_company("A", Some("a@a.se"), &[plumbing]);
    s.store.serve_cities(a, &[city]);

    let p = s
        .store
        .add_project("P", Some(plumbing), Some(zip), ProjectProgress::Created);

    let report = s.app.project_service.mark_as_moderated(p).await.unwrap();
    assert_eq!(report.matched, vec![a]);

    s.app.project_service.start_project(p).await.unwrap();
    let transition = s.app.finish_service.confirm_finish_by_company(p).await.unwrap();
    assert_eq!(transition.outcome, FinishOutcome::AwaitingCounterpart);

    let timeline = s.app.project_service.timeline(p).await.unwrap();
    assert!(timeline.started_at.is_some());
    assert!(timeline.is_company_confirmed_finish);
}
