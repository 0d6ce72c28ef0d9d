//! Prompt templates for the generative pipeline steps.
//!
//! Templates are plain text with `{name}` placeholders. Values are substituted
//! after escaping angle brackets, so request text cannot close the XML-style
//! sections the templates use to fence data from instructions.

use crate::gateway::Message;

/// Rendered prompt ready for the gateway.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: String,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Escape the characters that could open or close a prompt section.
fn escape_tag_chars(s: &str) -> String {
    s.replace('<', "&lt;").replace('>', "&gt;")
}

/// A prompt template with `{name}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Substitute every `{name}` with its escaped value.
    ///
    /// Placeholders without a value are left in place.
    pub fn render(&self, vars: &[(&str, &str)]) -> PromptInstance {
        let fill = |text: &str| {
            vars.iter().fold(text.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), &escape_tag_chars(value))
            })
        };

        PromptInstance {
            template_slug: self.slug.to_string(),
            system: fill(self.system).trim().to_string(),
            user: fill(self.user).trim().to_string(),
        }
    }

    /// Render with raw (unescaped) values for trusted, pipeline-built sections,
    /// followed by escaped values for everything else.
    pub fn render_with_trusted(
        &self,
        trusted: &[(&str, &str)],
        vars: &[(&str, &str)],
    ) -> PromptInstance {
        let substitute = |text: &str| {
            trusted.iter().fold(text.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
        };
        let partially = self.render(vars);

        PromptInstance {
            template_slug: partially.template_slug,
            system: substitute(&partially.system),
            user: substitute(&partially.user),
        }
    }
}

// =============================================================================
// Step prompts
// =============================================================================

pub const ENTITY_ANNOTATION: PromptTemplate = PromptTemplate {
    slug: "entity_annotation_v1",
    system: r#"You are a named-entity tagger for short marketing briefs. Tag entities with one of: GPE, LOC, EVENT, PRODUCT, PERSON, NORP, DATE, TIME, ORG, OTHER. Separately list the nouns and proper nouns of the text that are not part of any entity, with their dictionary form (lemma). Copy entity text exactly as it appears. Output JSON only."#,
    user: r#"<text>
{text}
</text>

Return JSON of the form:
{"entities": [{"text": "...", "label": "EVENT"}], "nouns": [{"text": "...", "lemma": "...", "proper": false}]}"#,
};

pub const TREND_SUMMARY: PromptTemplate = PromptTemplate {
    slug: "trend_summary_v1",
    system: r#"You are a local marketing analyst. You answer strictly from the search snippets you are given. If the snippets do not say something, you do not say it either."#,
    user: r#"Using ONLY the search snippets below about marketing timing and public interest for '{topic}' in '{location}', state the best timing recommendation or the current level of interest for a marketing campaign. Be concise.

<search_results>
{search_results}
</search_results>

Timing / interest summary:"#,
};

pub const SNIPPET_ANSWER: PromptTemplate = PromptTemplate {
    slug: "snippet_answer_v1",
    system: r#"You answer questions using ONLY the provided search snippets. Never add facts that are not present in the snippets. Answer concisely and directly."#,
    user: r#"<search_results>
{search_results}
</search_results>

Question: {query}
Answer:"#,
};

pub const PERSONA: PromptTemplate = PromptTemplate {
    slug: "persona_v1",
    system: r#"You are a market researcher who builds actionable audience personas for hyper-local campaigns run by small Indian businesses. You produce exactly one persona as JSON and nothing else."#,
    user: r#"Combine everything below into ONE detailed target-audience persona for this campaign.

IMPORTANT: read the previous campaign results carefully. Use them to refine the description and, above all, the preferred_channels and motivation_triggers, favouring what demonstrably worked before for this business.

<request>
{user_input}
</request>

<entities>
{entities}
</entities>

<trends>
{trend_data}
</trends>

<local_context>
{local_context}
</local_context>

<previous_results>
{previous_results}
</previous_results>

Respond with a JSON object matching this schema exactly:
{format_instructions}"#,
};

pub const STRATEGY: PromptTemplate = PromptTemplate {
    slug: "strategy_v1",
    system: r#"You are a data-driven marketing strategist for low-budget, hyper-local campaigns run by small Indian businesses such as cafes and neighbourhood shops. You respond with JSON only."#,
    user: r#"Recommend the channel mix, an exact integer budget split, and a campaign angle.

<request>
{user_input}
</request>

<audience_persona>
{audience_persona}
</audience_persona>

<local_context>
{local_context}
</local_context>

<previous_results>
{previous_results}
</previous_results>

Total budget: {total_budget} INR
Channel preference: {channel_preference}

Rules:
1. Channel mix.
   - Preference "Online": recommend 1-3 online channels.
   - Preference "Offline": recommend 1-3 offline channels (for example pamphlets, local banners, in-store signage).
   - Preference "Both" or "AI Recommend": you MUST include at least one online AND at least one offline channel, 2-3 channels in total. Only if the total budget is below {low_budget_threshold} INR may you pick the single most impactful channel instead.
   - Name channels specifically (for example "Instagram Stories Ads", "WhatsApp Broadcast", "Pamphlet Distribution near Colleges").
2. Budget split: allocate exactly {total_budget} INR across recommended_channels as integers. Every recommended channel must appear in budget_split.
3. Weight previous results heavily: favour channels with proven conversion rates and say how past results shaped the decision. Without past results, rely on the persona and general small-business practice.
4. Justification: 2-3 sentences covering audience, context, budget constraints and past performance.
5. Campaign angle: a short, catchy strategic theme.

Respond with a JSON object matching this schema exactly:
{format_instructions}"#,
};

pub const CREATIVE: PromptTemplate = PromptTemplate {
    slug: "creative_v1",
    system: r#"You are a copywriter who writes short, engaging, action-oriented ad copy for hyper-local campaigns run by small Indian businesses. You respond with JSON only."#,
    user: r#"Write channel-specific marketing copy.

Campaign angle: {campaign_angle}

<audience_persona>
{audience_persona}
</audience_persona>

Channels: {channel_list}

Rules:
1. Write copy for EVERY channel listed below. Never answer "N/A" or leave a value empty.
2. Use placeholders such as [Shop Name], [Offer Details], [Dates], [Address] where they fit.
3. Every piece of copy tells the reader where the tracking link or QR code is and what to do with it.
4. Match the length to the channel: signage is a few words, social posts can breathe.

Use exactly these JSON keys:
{channel_sections}

Respond with a JSON object matching this schema exactly:
{format_instructions}"#,
};

pub const VISUALS: PromptTemplate = PromptTemplate {
    slug: "visuals_v1",
    system: r#"You are a visual concept artist for small-business marketing in India. You write prompts for image-generation models. You respond with JSON only."#,
    user: r#"Write exactly 2 distinct, descriptive image-generation prompts for this campaign. Describe subject, setting, style and mood; keep them culturally relevant and aligned with the message.

Campaign angle: {campaign_angle}

<audience_persona>
{audience_persona}
</audience_persona>

<ad_copy>
{creative_content}
</ad_copy>

Respond with a JSON object matching this schema exactly:
{format_instructions}"#,
};
