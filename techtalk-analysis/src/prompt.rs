//! Prompt templates for page analysis and post classification.

/// System instruction sent with every page analysis request.
pub const ANALYSIS_SYSTEM_PROMPT: &str =
    "당신은 웹페이지 내용을 분석하고 요약하는 전문가입니다. 항상 JSON 형식으로 응답하세요.";

/// System instruction sent with every classification request.
pub const CLASSIFY_SYSTEM_PROMPT: &str =
    "당신은 기술 관련 글을 분류하는 전문가입니다. 반드시 'true' 또는 'false'로만 답하세요.";

/// Build the analysis prompt for a page. The `\n` sequences in the template
/// are the literal two-character escape the model is asked to emit.
pub fn build_prompt(url: &str, text: &str) -> String {
    format!(
        r#"
아래 웹페이지의 내용을 분석해서 title, summary, tags를 뽑아주세요.

- title: 웹페이지의 핵심 주제를 잘 나타내는 간결한 제목 (한국어)
- summary: 배열 형식으로 3~5개의 항목. 각 항목은 "[소제목 이모지] 주제 키워드\n- 요약 문장 1\n- 요약 문장 2..." 구조의 string입니다.
    - 각 항목은 서로 다른 핵심 내용을 담아야 하며, 중복 없이 작성
    - 줄바꿈(\n)으로 소제목과 본문을 구분
    - 각 본문은 실제 웹페이지의 구체적인 정보, 수치, 사례, 인사이트를 포함
    - 각 문장은 반드시 '~습니다'로 끝나는 격식체(존댓말)로 작성해 주세요.
- tags: 웹페이지의 주제, 카테고리, 핵심 키워드를 짧고 명확한 한 단어(한국어 또는 영어)로만 뽑아주세요.
    - 예: ["AI", "캐싱", "최적화", "추천", "검색", "챗봇"]
    - 문장, 설명, 긴 구문은 절대 포함하지 마세요. 카테고리 범주화할 수 있는 키워드로 뽑아주세요.
    - 최대 5개, 평균 2~3개

줄바꿈은 반드시 항상 (\n)으로 작성하세요.
아래 JSON 형식으로만 응답해 주세요. 다른 설명, 코드블록( ``` ) 등은 절대 포함하지 마세요.

예시:
{{
  "title": "서비스 혁신 사례",
  "summary": [
    "🚀 혁신 도입\n- 2023년 5월, 새로운 AI 기술을 도입해 서비스 품질이 30% 향상되었습니다.\n- 고객 만족도 조사에서 4.8점을 기록했습니다.",
    "💡 자동화 효과\n- 업무 자동화로 연간 1,000시간의 인건비를 절감했습니다."
  ],
  "tags": ["AI", "자동화", "고객만족", "Web"]
}}

웹페이지 URL: {url}
내용: {text}
"#
    )
}

/// Build the tech-or-not classification prompt.
pub fn build_classify_prompt(content: &str) -> String {
    format!(
        r#"
아래 글이 IT, 소프트웨어, 하드웨어, 프로그래밍, 컴퓨터, 인터넷, 기술 트렌드 등 기술과 직접적으로 관련된 내용인지 판단하세요.

다음과 같은 경우에는 모두 'false'로 답하세요:
- 비속어, 욕설, 혐오 표현이 포함된 글
- 명백한 광고, 상업적 홍보, 구매/할인/이벤트/무료 체험/카톡 문의/연락처/링크 등 상업적 목적이 명확한 글
- 도배(의미 없는 반복, 과도한 이모티콘/문자 반복 등)
- 정치, 종교, 일상, 잡담, 기술과 무관한 내용

'true' 또는 'false' 한 단어로만, 다른 말은 절대 하지 마세요.

글: {content}
"#
    )
}
