//! Prompt templates for the advisory model.

use crate::models::advisory::CareTipsRequest;

/// Care tips from structured farm data. The model must answer `{"careTips": "..."}`.
pub fn care_tips_prompt(request: &CareTipsRequest) -> String {
    let disease_history = if request.disease_history.trim().is_empty() {
        "-"
    } else {
        request.disease_history.as_str()
    };

    format!(
        "You are an expert in catfish farming, providing advice to farmers.\n\n\
         Based on the following data about the catfish farm, generate personalized tips on \
         pond maintenance and disease prevention.\n\n\
         Pond Count: {}\n\
         Pond Area: {} square meters\n\
         Catfish Type: {}\n\
         Stocking Density: {} per square meter\n\
         Feed Type: {}\n\
         Water Source: {}\n\
         Disease History: {}\n\
         Current Health Status: {}\n\n\
         Respond with a JSON object of the form {{\"careTips\": \"...\"}}.",
        request.pond_count,
        request.pond_area,
        request.catfish_type,
        request.stocking_density,
        request.feed_type,
        request.water_source,
        disease_history,
        request.current_health_status,
    )
}

/// Care tips answering a free-form question.
pub fn question_prompt(question: &str) -> String {
    format!(
        "You are an expert in catfish farming, providing advice to farmers.\n\n\
         A farmer has the following question or request:\n\"{}\"\n\n\
         Please provide clear, concise, and actionable tips or an explanation that answers \
         their question. Structure your response in a way that is easy for a farmer to \
         understand.\n\n\
         Respond with a JSON object of the form {{\"careTips\": \"...\"}}.",
        question.trim()
    )
}

/// Photo diagnosis. The image is attached as inline data next to this text.
pub const DIAGNOSIS_PROMPT: &str = "You are an expert veterinarian specializing in aquaculture \
and fish diseases, particularly for catfish (lele). Analyze the attached photo provided by a \
farmer and offer a preliminary diagnosis.\n\n\
1. Determine if the creature in the image is a catfish and set `isCatfish` accordingly.\n\
2. If it is a catfish, examine it for signs of common diseases (white spots, fin rot, lesions, \
bloating, unusual coloration, parasites).\n\
3. Give a concise `diagnosis` of what you see. If the fish looks healthy, say \"Ikan tampak \
sehat, aktif, dan tidak ada tanda-tanda penyakit.\"\n\
4. Set `disease` to the common Indonesian disease name, \"Sehat\" if healthy, or \
\"Tidak teridentifikasi\" if it is not a catfish.\n\
5. Give a short, practical `recommendation` for the farmer; for healthy fish, a simple \
preventive tip.\n\n\
Respond with a JSON object with the fields isCatfish (boolean), disease, diagnosis, \
recommendation (strings). Use clear, easy-to-understand language.";
