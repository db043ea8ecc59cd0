// Serveurs amont simulés, partagés par les tests des agrégateurs et des routes.
use chrono::Utc;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub async fn mount_public_github(server: &MockServer, stars: (u64, u64)) {
    Mock::given(method("GET"))
        .and(path("/users/ofri-peretz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_repos": 35,
            "followers": 51,
            "following": 30,
            "created_at": "2016-06-01T00:00:00Z"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/ofri-peretz/repos"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "ofriperetz-dev", "stargazers_count": stars.0, "forks_count": 1, "watchers_count": stars.0,
              "language": "Vue", "fork": false, "html_url": "https://github.com/ofri-peretz/ofriperetz-dev", "description": "site" },
            { "name": "eslint", "stargazers_count": stars.1, "forks_count": 1, "watchers_count": stars.1,
              "language": "TypeScript", "fork": false, "html_url": "https://github.com/ofri-peretz/eslint", "description": null },
            { "name": "playground", "stargazers_count": 100, "forks_count": 9, "watchers_count": 100,
              "language": "Rust", "fork": false, "html_url": "https://github.com/ofri-peretz/playground", "description": null },
            { "name": "eslint", "stargazers_count": 900, "forks_count": 90, "watchers_count": 900,
              "language": "JavaScript", "fork": true, "html_url": "https://github.com/someone/eslint", "description": null }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/ofri-peretz/events/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "type": "PushEvent", "created_at": "2026-01-05T10:00:00Z",
              "repo": { "name": "ofri-peretz/eslint" }, "payload": { "size": 3 } }
        ])))
        .mount(server)
        .await;
}

// Chaque paquet renvoie `history` téléchargements sur la plage passée et `today` sur le jour courant.
pub async fn mount_npm(server: &MockServer, packages: &[(&str, u64, u64)]) {
    let objects: Vec<Value> = packages
        .iter()
        .map(|(name, _, _)| json!({ "package": { "name": name } }))
        .collect();

    Mock::given(method("GET"))
        .and(path("/-/v1/search"))
        .and(query_param("text", "maintainer:ofriperetz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "objects": objects })))
        .mount(server)
        .await;

    let today = Utc::now().date_naive();
    for (name, history, today_count) in packages {
        Mock::given(method("GET"))
            .and(path(format!("/downloads/range/{today}:{today}/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "downloads": [{ "day": today.to_string(), "downloads": today_count }]
            })))
            .with_priority(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex(format!(r"^/downloads/range/[0-9-]+:[0-9-]+/{name}$")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "downloads": [
                    { "day": "2026-01-01", "downloads": history / 2 },
                    { "day": "2026-01-02", "downloads": history - history / 2 }
                ]
            })))
            .with_priority(2)
            .mount(server)
            .await;
    }
}

pub fn devto_article(id: u64, views: u64, reactions: u64, published: Option<&str>) -> Value {
    json!({
        "id": id,
        "title": format!("Article {id}"),
        "description": "",
        "url": format!("https://dev.to/ofri-peretz/article-{id}"),
        "published_at": published,
        "reading_time_minutes": 5,
        "positive_reactions_count": reactions,
        "comments_count": 1,
        "page_views_count": views,
        "tag_list": ["security"]
    })
}

pub async fn mount_devto_authenticated(server: &MockServer, articles: Value, followers: usize) {
    Mock::given(method("GET"))
        .and(path("/articles/me/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(articles))
        .mount(server)
        .await;

    let followers: Vec<Value> = (0..followers).map(|id| json!({ "id": id })).collect();
    Mock::given(method("GET"))
        .and(path("/followers/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(followers))
        .mount(server)
        .await;
}

pub async fn mount_devto_public(server: &MockServer, articles: Value) {
    Mock::given(method("GET"))
        .and(path("/articles"))
        .and(query_param("username", "ofri-peretz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(articles))
        .mount(server)
        .await;
}
