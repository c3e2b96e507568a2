use crate::model::Message;

const QUERY_BUILDER_INSTRUCTIONS: &str = "You are an expert GraphQL query builder.
Your task is to translate natural language questions into valid GraphQL queries.
Use the following GraphQL schema:";

const QUERY_BUILDER_OUTPUT: &str = "Return only the valid GraphQL query without any explanation.";

const FORMATTER_INSTRUCTIONS: &str =
    "You are a helpful assistant that formats GraphQL API responses into human-readable text.
Provide a concise summary of the data, focusing on the key information requested.
Make sure your response is natural, conversational, and directly answers the original question.";

/// Messages asking the model to translate `question` into a query against `schema`.
///
/// A missing schema leaves the schema section of the prompt empty.
pub(crate) fn query_generation(question: &str, schema: Option<&str>) -> Vec<Message> {
    let schema = schema.unwrap_or_default();
    vec![
        Message::system(format!(
            "{QUERY_BUILDER_INSTRUCTIONS}\n\n{schema}\n\n{QUERY_BUILDER_OUTPUT}"
        )),
        Message::user(format!("Question: {question}")),
    ]
}

/// Messages asking the model to answer `question` from the rendered API response.
pub(crate) fn response_formatting(question: &str, data: &str) -> Vec<Message> {
    vec![
        Message::system(FORMATTER_INSTRUCTIONS),
        Message::user(format!(
            "Original question: {question}\n API response data: {data}"
        )),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Role;

    #[test]
    fn it_embeds_the_schema_and_question() {
        let messages = query_generation("find jobs", Some("type Query { jobs: [Job] }"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0]
            .content
            .contains("\n\ntype Query { jobs: [Job] }\n\n"));
        assert!(messages[0]
            .content
            .ends_with("Return only the valid GraphQL query without any explanation."));
        assert_eq!(messages[1], Message::user("Question: find jobs"));
    }

    #[test]
    fn it_leaves_a_missing_schema_empty() {
        let messages = query_generation("find jobs", None);
        assert!(messages[0]
            .content
            .contains("Use the following GraphQL schema:\n\n\n\nReturn only"));
    }

    #[test]
    fn it_embeds_question_and_data() {
        let messages = response_formatting("find jobs", r#"{"data":{"jobs":[]}}"#);
        assert_eq!(messages[0], Message::system(FORMATTER_INSTRUCTIONS));
        assert_eq!(
            messages[1],
            Message::user("Original question: find jobs\n API response data: {\"data\":{\"jobs\":[]}}")
        );
    }
}
