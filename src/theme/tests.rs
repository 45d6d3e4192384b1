//! Tests for the theme engine

use super::*;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write `files` into `<dir>/<theme_name>/`
fn create_theme(dir: &Path, theme_name: &str, files: &[(&str, &str)]) -> PathBuf {
    let theme_path = dir.join(theme_name);
    for (name, content) in files {
        let path = theme_path.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    theme_path
}

fn template_names(engine: &ThemeEngine) -> Vec<&str> {
    engine.tera.get_template_names().collect()
}

fn standard_vars() -> StandardTemplateVars {
    StandardTemplateVars::new("Blogicum", "/")
}

fn empty_page() -> serde_json::Value {
    json!({
        "items": [],
        "number": 1,
        "num_pages": 1,
        "total": 0,
        "has_next": false,
        "has_previous": false,
    })
}

fn sample_post() -> serde_json::Value {
    json!({
        "id": 7,
        "title": "Morning <walk>",
        "text": "Line one\nLine two",
        "pub_date": "2024-03-01T09:30:00+00:00",
        "author_id": 1,
        "author_username": "anna",
        "category_title": "Travel",
        "category_slug": "travel",
        "category_is_published": true,
        "location_name": "Lisbon",
        "is_published": true,
        "image": null,
        "comment_count": 2,
        "created_at": "2024-03-01T09:30:00+00:00",
    })
}

#[test]
fn test_embedded_templates_cover_every_page() {
    let engine = ThemeEngine::embedded().unwrap();
    for name in [
        "base.html",
        "includes/macros.html",
        "blog/index.html",
        "blog/category.html",
        "blog/detail.html",
        "blog/create.html",
        "blog/comment.html",
        "users/profile.html",
        "users/profile_edit.html",
        "registration/registration_form.html",
        "registration/login.html",
        "errors/404.html",
        "errors/500.html",
    ] {
        assert!(template_names(&engine).contains(&name), "missing template {}", name);
    }
    assert!(engine.overrides().is_empty());
    assert_eq!(engine.theme_name(), "default");
}

#[test]
fn test_missing_theme_directory_falls_back_to_embedded() {
    let dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(dir.path(), "nonexistent").unwrap();

    assert_eq!(engine.theme_name(), "nonexistent");
    assert!(template_names(&engine).contains(&"blog/index.html"));
    assert!(engine.overrides().is_empty());
}

#[test]
fn test_theme_directory_overrides_by_name() {
    let dir = TempDir::new().unwrap();
    create_theme(
        dir.path(),
        "custom",
        &[
            ("errors/404.html", "custom not found: {{ request_path | urlencode_strict }}"),
            ("extra/hello.html", "hello {{ name }}"),
            ("notes.txt", "ignored"),
        ],
    );

    let engine = ThemeEngine::new(dir.path(), "custom").unwrap();
    assert_eq!(engine.overrides(), ["errors/404.html", "extra/hello.html"]);
    assert!(!template_names(&engine).contains(&"notes.txt"));

    let html = engine
        .render_with_standard_vars(
            "errors/404.html",
            &TeraContext::new(),
            &StandardTemplateVars::new("Blogicum", "/missing/"),
        )
        .unwrap();
    assert_eq!(html, "custom not found: %2Fmissing%2F");

    let mut context = TeraContext::new();
    context.insert("name", "world");
    assert_eq!(engine.render("extra/hello.html", &context).unwrap(), "hello world");
}

#[test]
fn test_override_can_extend_embedded_base() {
    let dir = TempDir::new().unwrap();
    create_theme(
        dir.path(),
        "custom",
        &[(
            "errors/500.html",
            r#"{% extends "base.html" %}{% block content %}<p>broken</p>{% endblock content %}"#,
        )],
    );

    let engine = ThemeEngine::new(dir.path(), "custom").unwrap();
    let html = engine
        .render_with_standard_vars("errors/500.html", &TeraContext::new(), &standard_vars())
        .unwrap();
    assert!(html.contains("<p>broken</p>"));
    assert!(html.contains("<title>Blogicum</title>"));
}

#[test]
fn test_invalid_override_fails_to_load() {
    let dir = TempDir::new().unwrap();
    create_theme(dir.path(), "broken", &[("base.html", "{% block content %}")]);

    assert!(ThemeEngine::new(dir.path(), "broken").is_err());
}

#[test]
fn test_render_unknown_template_is_error() {
    let engine = ThemeEngine::embedded().unwrap();
    let err = engine.render("nope.html", &TeraContext::new()).unwrap_err();
    assert!(err.to_string().contains("nope.html"));
}

#[test]
fn test_standard_vars_show_anonymous_navigation() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut context = TeraContext::new();
    context.insert("page", &empty_page());

    let html = engine
        .render_with_standard_vars(
            "blog/index.html",
            &context,
            &StandardTemplateVars::new("My Blog", "/category/travel/"),
        )
        .unwrap();

    assert!(html.contains("My Blog"));
    assert!(html.contains("/auth/login/?next=%2Fcategory%2Ftravel%2F"));
    assert!(!html.contains("Log out"));
}

#[test]
fn test_standard_vars_show_current_user() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut context = TeraContext::new();
    context.insert("page", &empty_page());

    let user = User {
        id: 3,
        username: "anna".to_string(),
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: String::new(),
        is_staff: false,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    let vars = standard_vars().with_user(Some(&user));
    assert_eq!(vars.current_user.as_ref().map(|u| u.id), Some(3));

    let html = engine
        .render_with_standard_vars("blog/index.html", &context, &vars)
        .unwrap();
    assert!(html.contains("/profile/anna/"));
    assert!(html.contains("Log out"));
}

#[test]
fn test_post_card_escapes_title() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut page = empty_page();
    page["items"] = json!([sample_post()]);
    page["total"] = json!(1);
    let mut context = TeraContext::new();
    context.insert("page", &page);

    let html = engine
        .render_with_standard_vars("blog/index.html", &context, &standard_vars())
        .unwrap();
    assert!(html.contains("Morning &lt;walk&gt;"));
    assert!(html.contains("/category/travel/"));
    assert!(html.contains("Lisbon"));
    assert!(html.contains("01 March 2024"));
    assert!(!html.contains("class=\"paginator\""));
}

#[test]
fn test_paginator_links_render_for_middle_page() {
    let engine = ThemeEngine::embedded().unwrap();
    let mut page = empty_page();
    page["items"] = json!([sample_post()]);
    page["number"] = json!(2);
    page["num_pages"] = json!(3);
    page["has_next"] = json!(true);
    page["has_previous"] = json!(true);
    page["previous_page_number"] = json!(1);
    page["next_page_number"] = json!(3);
    let mut context = TeraContext::new();
    context.insert("page", &page);

    let html = engine
        .render_with_standard_vars("blog/index.html", &context, &standard_vars())
        .unwrap();
    assert!(html.contains("Page 2 of 3"));
    assert!(html.contains("?page=1"));
    assert!(html.contains("?page=3"));
}

#[test]
fn test_render_with_fallback_uses_error_template() {
    let engine = ThemeEngine::embedded().unwrap();

    let html = engine.render_with_fallback("missing.html", &TeraContext::new(), &standard_vars(), 500);
    assert!(html.contains("<h1>500</h1>"));
    assert!(html.contains("<title>Server error | Blogicum</title>"));
}

#[test]
fn test_render_with_fallback_renders_requested_page() {
    let engine = ThemeEngine::embedded().unwrap();

    let html = engine.render_with_fallback(
        "errors/404.html",
        &TeraContext::new(),
        &StandardTemplateVars::new("Blogicum", "/gone/"),
        404,
    );
    assert!(html.contains("<h1>404</h1>"));
}

#[test]
fn test_render_with_fallback_builtin_page() {
    let dir = TempDir::new().unwrap();
    create_theme(
        dir.path(),
        "strict",
        &[("errors/500.html", "{{ missing_variable }}")],
    );
    let engine = ThemeEngine::new(dir.path(), "strict").unwrap();

    let html = engine.render_with_fallback("missing.html", &TeraContext::new(), &standard_vars(), 500);
    assert_eq!(html, simple_error_page(500, "Server error"));

    let html = engine.render_with_fallback(ERROR_TEMPLATE, &TeraContext::new(), &standard_vars(), 404);
    assert_eq!(html, simple_error_page(404, "Page not found"));
}

#[test]
fn test_simple_error_page_escapes_title() {
    let html = simple_error_page(404, "<Not Found>");
    assert!(html.contains("<h1>404</h1>"));
    assert!(html.contains("&lt;Not Found&gt;"));
}
