/// Sanitizes rich text (question content, analysis, bank descriptions) with ammonia.
///
/// Safe formatting tags such as <b> or <sub> survive; scripts, iframes and
/// event-handler attributes are stripped. Answers and options never pass
/// through here: grading compares them byte for byte.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
