//! German-language subject/body rendering for each outbound notification
//! kind. Kept separate from `service.rs` so a new notification only ever
//! touches this one file.

use super::service::NotificationKind;

pub fn render(kind: NotificationKind, params: &serde_json::Value) -> (String, String) {
    let get = |key: &str| params.get(key).and_then(|v| v.as_str()).unwrap_or("-").to_string();

    match kind {
        NotificationKind::Eingangsbestaetigung => {
            let reference_code = get("reference_code");
            (
                format!("Eingangsbestätigung Ihres Hinweises {reference_code}"),
                format!(
                    "Sehr geehrte/r Hinweisgeber/in,\n\n\
                     wir bestätigen den Eingang Ihres Hinweises mit der Referenznummer {reference_code}.\n\
                     Ihr Hinweis wird nun geprüft. Gemäß § 17 HinSchG erhalten Sie innerhalb von drei Monaten \
                     eine Rückmeldung zum Stand der Bearbeitung.\n\n\
                     Mit freundlichen Grüßen\nInterne Meldestelle"
                ),
            )
        }
        NotificationKind::RueckmeldungErinnerung => {
            let case_number = get("case_number");
            let due_at = get("due_at");
            (
                format!("Erinnerung: Rückmeldefrist für Fall {case_number}"),
                format!(
                    "Die Rückmeldefrist für den Fall {case_number} läuft am {due_at} ab.\n\
                     Bitte stellen Sie sicher, dass dem Hinweisgeber rechtzeitig eine Rückmeldung \
                     gemäß § 17 HinSchG zugeht."
                ),
            )
        }
        NotificationKind::FristUeberschritten => {
            let case_number = get("case_number");
            let deadline_type = get("deadline_type");
            (
                format!("Frist überschritten: Fall {case_number}"),
                format!(
                    "Die Frist '{deadline_type}' für den Fall {case_number} wurde überschritten und der Fall \
                     wurde zur weiteren Bearbeitung eskaliert. Bitte prüfen Sie den Vorgang umgehend."
                ),
            )
        }
        NotificationKind::AnOmbudspersonWeitergeleitet => {
            let case_number = get("case_number");
            (
                format!("Neuer Fall zur Prüfung: {case_number}"),
                format!(
                    "Der Fall {case_number} wurde Ihnen als Ombudsperson zur unabhängigen Prüfung \
                     weitergeleitet. Die Identität des Hinweisgebers bleibt Ihnen gegenüber vertraulich, \
                     soweit sie nicht vom Hinweisgeber selbst offengelegt wurde."
                ),
            )
        }
        NotificationKind::NeueNachricht => {
            let receipt_code = get("receipt_code");
            (
                "Neue Nachricht zu Ihrem Hinweis".to_string(),
                format!(
                    "Es liegt eine neue Nachricht zu Ihrem anonym eingereichten Hinweis vor. \
                     Bitte rufen Sie den Status unter Angabe Ihres Zugangscodes ({receipt_code}) ab."
                ),
            )
        }
    }
}
