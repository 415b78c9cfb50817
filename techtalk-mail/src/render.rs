use crate::digest::DigestPost;
use crate::MailError;
use tera::{Context, Tera};

const DIGEST_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Tech Talk 주간 신규 게시글 안내</title>
    <style>
        body { font-family: 'Pretendard', -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f5f5; color: #222; }
        .container { background: #fff; max-width: 550px; margin: 40px auto; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.07); padding: 32px; }
        h1 { color: #0a80ed; font-size: 1.5rem; margin-bottom: 8px; }
        .period { color: #666; font-size: 1rem; margin-bottom: 24px; }
        ul { padding-left: 1.2em; }
        li { margin-bottom: 10px; font-size: 1.08rem; }
        .footer { margin-top: 32px; color: #888; font-size: 0.95rem; text-align: center; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Tech Talk 주간 신규 게시글 안내</h1>
        <div class="period">{{ week_start }} ~ {{ week_end }}</div>
        {% if posts | length > 0 %}
        <ul>
            {% for post in posts %}
            <li>{{ post.title }}</li>
            {% endfor %}
        </ul>
        {% else %}
        <div>이번 주에는 새로운 게시글이 없습니다.</div>
        {% endif %}
        <div class="footer">이 이메일은 Tech Talk의 주간 신규 게시글 안내 서비스에 따라 자동 발송되었습니다.</div>
    </div>
</body>
</html>
"#;

const TEST_TEMPLATE: &str = r#"<html>
<body>
    <h1>Tech Talk 이메일 설정 테스트</h1>
    <p>이메일 발송이 정상적으로 설정되었습니다.</p>
    <p>발송 시간: {{ sent_at }}</p>
</body>
</html>
"#;

/// Render the digest body. Post titles are HTML-escaped.
pub fn render_digest(
    posts: &[DigestPost],
    week_start: &str,
    week_end: &str,
) -> Result<String, MailError> {
    let mut ctx = Context::new();
    ctx.insert("posts", posts);
    ctx.insert("week_start", week_start);
    ctx.insert("week_end", week_end);
    Ok(Tera::one_off(DIGEST_TEMPLATE, &ctx, true)?)
}

pub fn render_test_email(sent_at: &str) -> Result<String, MailError> {
    let mut ctx = Context::new();
    ctx.insert("sent_at", sent_at);
    Ok(Tera::one_off(TEST_TEMPLATE, &ctx, true)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str) -> DigestPost {
        DigestPost {
            id: 1,
            title: title.to_string(),
            content: "body".into(),
            created_at: "2025-01-06 10:00".into(),
            views: 0,
            tags: vec![],
            url: None,
            comment_count: 0,
        }
    }

    #[test]
    fn lists_titles_with_escaping() {
        let html = render_digest(
            &[post("Rust <script>alert(1)</script>"), post("Tokio & friends")],
            "2025년 01월 06일",
            "2025년 01월 12일",
        )
        .unwrap();
        assert!(html.contains("2025년 01월 06일 ~ 2025년 01월 12일"));
        assert!(html.contains("<li>Rust &lt;script&gt;alert(1)&lt;&#x2F;script&gt;</li>"));
        assert!(html.contains("<li>Tokio &amp; friends</li>"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("새로운 게시글이 없습니다"));
    }

    #[test]
    fn empty_week_has_placeholder_line() {
        let html = render_digest(&[], "a", "b").unwrap();
        assert!(html.contains("이번 주에는 새로운 게시글이 없습니다."));
        assert!(!html.contains("<ul>"));
    }

    #[test]
    fn test_email_carries_timestamp() {
        let html = render_test_email("2025-01-06 09:00:00").unwrap();
        assert!(html.contains("발송 시간: 2025-01-06 09:00:00"));
    }
}
