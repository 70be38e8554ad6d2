mod helpers;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use helpers::{HandlerBuilder, MethodBuilder};
use restguard::authz::types::{grant, Caller, Decision, HttpVerb, ResourceHandlerDescriptor};
use restguard::authz::{extract, AccessEngine, RoleCatalog, RuleExtractor, UngrantedPolicy};

fn app_handlers() -> Vec<ResourceHandlerDescriptor> {
    vec![
        HandlerBuilder::new("/events")
            .named("EventEntityFacadeREST")
            .method(MethodBuilder::get("findAll", "/").roles(&["USER"]))
            .method(MethodBuilder::get("find", "/{id}").roles(&["USER"]))
            .method(MethodBuilder::post("create", "").roles(&["USER"]))
            .method(MethodBuilder::put("edit", "{id}").roles(&["MODERATOR"]).permissions(&["events:edit"]))
            .method(MethodBuilder::delete("remove", "{id}").roles(&["MODERATOR"]))
            .method(MethodBuilder::get("locations", "{id}/locations").roles(&["USER"]))
            .method(MethodBuilder::new("validateInput"))
            .build(),
        HandlerBuilder::new("/users")
            .method(MethodBuilder::get("findAll", "").roles(&["ADMIN"]))
            .method(MethodBuilder::get("me", "me").roles(&["USER"]))
            .method(MethodBuilder::get("find", "{id}").roles(&["MODERATOR"]))
            .build(),
        HandlerBuilder::new("/maintenance")
            .method(MethodBuilder::post("purge", "purge"))
            .build(),
    ]
}

fn engine() -> AccessEngine {
    let engine = AccessEngine::build(extract(&app_handlers()));
    engine.set_always_grant_roles(["ADMIN"]);
    engine
}

#[test]
fn test_end_to_end_events() {
    let engine = engine();
    assert!(engine.authorize(HttpVerb::Get, "/events", "/events", &Caller::with_roles(["USER"])));
    assert!(!engine.authorize(HttpVerb::Get, "/events/5", "/events", &Caller::anonymous()));
    assert!(!engine.authorize(HttpVerb::Get, "/events/5", "/events", &Caller::with_roles(["GUEST"])));
    assert!(engine.authorize(HttpVerb::Delete, "/events/5", "/events", &Caller::with_roles(["ADMIN"])));
}

#[test]
fn test_default_deny() {
    let engine = engine();
    let caller = Caller::with_roles(["USER", "MODERATOR"]);
    for path in ["/mails", "/events/5/votes", "/users/5/roles", "/"] {
        assert!(!engine.authorize(HttpVerb::Get, path, "", &caller), "{path} should be denied");
    }
}

#[test]
fn test_superuser_bypass_everywhere() {
    let engine = engine();
    let admin = Caller::with_roles(["ADMIN"]);
    for verb in HttpVerb::ALL {
        assert!(engine.authorize(verb, "/nothing/here", "", &admin));
        assert!(engine.authorize(verb, "/events/1", "/other", &admin));
    }
}

#[test]
fn test_exact_beats_pattern() {
    let engine = engine();
    assert_eq!(
        engine.decide(HttpVerb::Get, "/users/me", "/users", &Caller::with_roles(["USER"])),
        Decision::ExactRule {
            path: "/users/me".into(),
            granted: true
        }
    );
    // The pattern would grant MODERATOR, but the exact rule decides first.
    assert!(!engine.authorize(HttpVerb::Get, "/users/me", "/users", &Caller::with_roles(["MODERATOR"])));
    assert!(engine.authorize(HttpVerb::Get, "/users/9", "/users", &Caller::with_roles(["MODERATOR"])));
}

#[test]
fn test_role_or_permission_grants() {
    let engine = engine();
    let moderator = Caller::with_roles(["MODERATOR"]);
    let editor = Caller::anonymous().permissions(["events:edit"]);
    let user = Caller::with_roles(["USER"]);

    assert!(engine.authorize(HttpVerb::Put, "/events/3", "/events", &moderator));
    assert!(engine.authorize(HttpVerb::Put, "/events/3", "/events", &editor));
    assert!(!engine.authorize(HttpVerb::Put, "/events/3", "/events", &user));
}

#[test]
fn test_role_only_rule_admin_without_permissions() {
    let handlers = [HandlerBuilder::new("")
        .method(MethodBuilder::get("list", "/users").roles(&["ADMIN"]))
        .build()];
    let engine = AccessEngine::build(extract(&handlers));
    assert!(engine.authorize(HttpVerb::Get, "/users", "", &Caller::with_roles(["ADMIN"])));
    assert!(!engine.authorize(HttpVerb::Get, "/users", "", &Caller::with_roles(["USER"])));
}

#[test]
fn test_union_on_duplicate_full_paths() {
    let handlers = [
        HandlerBuilder::new("/mails")
            .method(MethodBuilder::get("count", "count").roles(&["A"]))
            .build(),
        HandlerBuilder::new("/mails")
            .method(MethodBuilder::get("countUnread", "/count/").roles(&["B"]))
            .build(),
    ];
    let table = extract(&handlers);
    assert_eq!(table.len(), 1);

    let engine = AccessEngine::build(table);
    assert!(engine.authorize(HttpVerb::Get, "/mails/count", "/mails", &Caller::with_roles(["A"])));
    assert!(engine.authorize(HttpVerb::Get, "/mails/count", "/mails", &Caller::with_roles(["B"])));
}

#[test]
fn test_pattern_matching_is_segment_exact() {
    let engine = engine();
    let user = Caller::with_roles(["USER"]);
    assert!(engine.authorize(HttpVerb::Get, "/events/42/locations", "/events", &user));
    assert!(!engine.authorize(HttpVerb::Get, "/events/42/locations/99", "/events", &user));
    assert_eq!(
        engine.decide(HttpVerb::Get, "/events/locations", "/events", &user),
        Decision::PatternRule {
            pattern: "/events/{id}".into(),
            granted: true
        },
        "`/events/locations` has two segments and is matched by /events/{{id}}, not by the locations pattern"
    );
}

#[test]
fn test_ungranted_endpoint_policies() {
    let user = Caller::with_roles(["USER"]);
    let admin = Caller::with_roles(["ADMIN"]);

    let skip = engine();
    assert_eq!(
        skip.decide(HttpVerb::Post, "/maintenance/purge", "/maintenance", &user),
        Decision::NoMatchingRule
    );

    let deny = AccessEngine::build(
        RuleExtractor::new()
            .with_ungranted(UngrantedPolicy::DenyAll)
            .extract(&app_handlers()),
    );
    deny.set_always_grant_roles(["ADMIN"]);
    assert_eq!(
        deny.decide(HttpVerb::Post, "/maintenance/purge", "/maintenance", &user),
        Decision::ExactRule {
            path: "/maintenance/purge".into(),
            granted: false
        }
    );
    assert!(deny.authorize(HttpVerb::Post, "/maintenance/purge", "/maintenance", &admin));
}

#[test]
fn test_grant_markers() {
    let handlers = [HandlerBuilder::new("/users")
        .method(MethodBuilder::get("me", "me").roles(&[grant::ENDPOINT_CHECK]))
        .method(MethodBuilder::get("profile", "{id}/profile").roles(&[grant::AUTHENTICATED]))
        .build()];
    let engine = AccessEngine::build(extract(&handlers));

    assert!(engine.authorize(HttpVerb::Get, "/users/me", "/users", &Caller::with_roles(["USER"])));
    assert!(engine.authorize(HttpVerb::Get, "/users/me", "/users", &Caller::anonymous()));
    assert!(engine.authorize(HttpVerb::Get, "/users/3/profile", "/users", &Caller::with_roles(["GUEST"])));
    assert!(!engine.authorize(HttpVerb::Get, "/users/3/profile", "/users", &Caller::anonymous()));
}

#[test]
fn test_role_catalog_permissions() {
    let handlers = [HandlerBuilder::new("/events")
        .method(MethodBuilder::put("edit", "{id}").permissions(&["events:edit"]))
        .build()];
    let mut catalog = RoleCatalog::new();
    catalog.add("MODERATOR", ["events:edit"]);
    let engine = AccessEngine::build_with_catalog(extract(&handlers), catalog);

    assert!(engine.authorize(HttpVerb::Put, "/events/1", "/events", &Caller::with_roles(["MODERATOR"])));
    assert!(!engine.authorize(HttpVerb::Put, "/events/1", "/events", &Caller::with_roles(["USER"])));
}

#[test]
fn test_always_grant_swap_under_concurrent_readers() {
    let engine = Arc::new(engine());
    let old: HashSet<String> = ["ADMIN"].into_iter().map(String::from).collect();
    let new: HashSet<String> = ["ROOT", "SUPPORT"].into_iter().map(String::from).collect();

    thread::scope(|s| {
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            let (old, new) = (&old, &new);
            s.spawn(move || {
                for _ in 0..2_000 {
                    let snapshot = engine.always_grant_roles();
                    assert!(*snapshot == *old || *snapshot == *new, "partial set observed");
                    engine.authorize(HttpVerb::Get, "/events/1", "/events", &Caller::with_roles(["USER"]));
                }
            });
        }
        s.spawn(|| {
            for i in 0..500 {
                if i % 2 == 0 {
                    engine.set_always_grant_roles(["ROOT", "SUPPORT"]);
                } else {
                    engine.set_always_grant_roles(["ADMIN"]);
                }
            }
        });
    });

    // Rule-based decisions are unaffected by swaps.
    assert!(engine.authorize(HttpVerb::Get, "/events/1", "/events", &Caller::with_roles(["USER"])));
}
