//! Portuguese routes spoken by the first browser client (`/nova-sessao`, `/personagens`,
//! `/explorar`, `/acao`). They run the same game operations as the English routes but answer
//! in that client's field names: `sucesso`, `erro`, `sessionId`, `jogador`, `hp_personagem`...

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::{non_empty, ActionBody, ExploreQuery};
use crate::game::{
    BattleOutcome, CharacterList, ExplorationEvent, GameError, GameService, MoveResult, SessionId,
    SessionView, TurnResult,
};

const DADOS_INVALIDOS: &str = "Dados inválidos.";

#[derive(Debug, Serialize)]
pub struct LegacyReply<T> {
    pub sucesso: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erro: Option<String>,
    #[serde(skip)]
    fatal: bool,
}

impl<T> LegacyReply<T> {
    fn from_result<U>(result: Result<U, GameError>, convert: impl FnOnce(U) -> T) -> Self {
        match result {
            Ok(value) => Self {
                sucesso: true,
                data: Some(convert(value)),
                erro: None,
                fatal: false,
            },
            Err(err) => Self {
                sucesso: false,
                data: None,
                erro: Some(err.public_message()),
                fatal: err.is_fatal(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NovaSessao {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    pub hp_personagem: u8,
    pub hp_monstro: u8,
}

impl From<SessionView> for NovaSessao {
    fn from(view: SessionView) -> Self {
        Self {
            session_id: view.session_id,
            hp_personagem: view.player_hp,
            hp_monstro: view.monster_hp.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Personagem {
    pub id: u32,
    pub nome: String,
    pub classe: String,
    pub ataque: u32,
    pub defesa: u32,
    pub hp_base: u8,
    pub nivel: u8,
}

#[derive(Debug, Serialize)]
pub struct Personagens {
    pub personagens: Vec<Personagem>,
}

impl From<CharacterList> for Personagens {
    fn from(list: CharacterList) -> Self {
        let personagens = list
            .characters
            .into_iter()
            .map(|c| Personagem {
                id: c.id,
                nome: c.name,
                classe: c.class,
                ataque: c.attack,
                defesa: c.defense,
                hp_base: c.base_hp,
                nivel: c.level,
            })
            .collect();
        Self { personagens }
    }
}

#[derive(Debug, Serialize)]
pub struct Exploracao {
    pub pos_x: u8,
    pub pos_y: u8,
    pub descricao: String,
    /// `monstro`, `item` or `nada`.
    pub evento: &'static str,
    pub em_combate: bool,
    pub hp_personagem: u8,
    pub hp_monstro: u8,
}

impl From<MoveResult> for Exploracao {
    fn from(m: MoveResult) -> Self {
        let evento = match m.event {
            ExplorationEvent::Encounter => "monstro",
            ExplorationEvent::Loot { .. } => "item",
            ExplorationEvent::Nothing => "nada",
        };
        Self {
            pos_x: m.position.x,
            pos_y: m.position.y,
            descricao: m.description,
            evento,
            em_combate: m.in_combat,
            hp_personagem: m.player_hp,
            hp_monstro: m.monster_hp.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Turno {
    pub jogador: String,
    pub monstro: String,
    pub hp_personagem: u8,
    /// 0 once the fight is over, which the client reads as the end of the battle.
    pub hp_monstro: u8,
    pub em_combate: bool,
    /// `vitoria` or `derrota` when the turn ended the fight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resultado: Option<&'static str>,
}

impl From<TurnResult> for Turno {
    fn from(t: TurnResult) -> Self {
        let resultado = t.outcome.map(|o| match o {
            BattleOutcome::Victory { .. } => "vitoria",
            BattleOutcome::Defeat => "derrota",
        });
        Self {
            jogador: t.player_message,
            monstro: t.monster_message,
            hp_personagem: t.player_hp,
            hp_monstro: t.monster_hp.unwrap_or(0),
            em_combate: t.in_combat,
            resultado,
        }
    }
}

fn respond<T: Serialize>(reply: LegacyReply<T>) -> Response {
    let status = if reply.fatal {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(reply)).into_response()
}

fn dados_invalidos() -> Response {
    let reply = LegacyReply::<()> {
        sucesso: false,
        data: None,
        erro: Some(DADOS_INVALIDOS.to_string()),
        fatal: false,
    };
    (StatusCode::BAD_REQUEST, Json(reply)).into_response()
}

pub async fn nova_sessao(State(svc): State<Arc<GameService>>) -> Response {
    respond(LegacyReply::from_result(
        svc.create_session(None).await,
        NovaSessao::from,
    ))
}

pub async fn personagens(State(svc): State<Arc<GameService>>) -> Response {
    respond(LegacyReply::from_result(
        svc.list_characters().await,
        Personagens::from,
    ))
}

pub async fn explorar(
    State(svc): State<Arc<GameService>>,
    Query(query): Query<ExploreQuery>,
) -> Response {
    let (Some(id), Some(direcao)) = (non_empty(query.session_id), non_empty(query.direction))
    else {
        return dados_invalidos();
    };
    respond(LegacyReply::from_result(
        svc.move_session(&id, &direcao).await,
        Exploracao::from,
    ))
}

pub async fn acao(
    State(svc): State<Arc<GameService>>,
    body: Result<Json<ActionBody>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return dados_invalidos();
    };
    let (Some(id), Some(acao)) = (non_empty(body.session_id), non_empty(body.action)) else {
        return dados_invalidos();
    };
    respond(LegacyReply::from_result(
        svc.resolve_turn(&id, &acao).await,
        Turno::from,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::{GameStoreBuilder, ScriptedDice};
    use tempfile::TempDir;

    fn shared() -> (Arc<GameService>, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        let svc = GameService::with_dice(store, GameConfig::default(), Box::new(ScriptedDice::default()))
            .expect("service");
        (Arc::new(svc), dir)
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    async fn session_id(svc: &Arc<GameService>) -> String {
        let created = body_json(nova_sessao(State(svc.clone())).await).await;
        assert_eq!(created["sucesso"], true);
        created["sessionId"].as_str().expect("sessionId").to_string()
    }

    fn acao_body(id: &str, acao: &str) -> Result<Json<ActionBody>, JsonRejection> {
        Ok(Json(ActionBody {
            session_id: Some(id.to_string()),
            action: Some(acao.to_string()),
        }))
    }

    #[tokio::test]
    async fn acao_answers_with_the_client_field_names() {
        let (svc, _dir) = shared();
        let id = session_id(&svc).await;

        let resp = acao(State(svc), acao_body(&id, "curar")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["sucesso"], true);
        assert!(json["jogador"].as_str().is_some());
        assert!(json["monstro"].as_str().is_some());
        assert_eq!(json["hp_personagem"], 100);
        assert_eq!(json["hp_monstro"], 0);
        assert!(json.get("erro").is_none());
        assert!(json.get("success").is_none());
        assert!(json.get("player_hp").is_none());
    }

    #[tokio::test]
    async fn acao_failures_carry_erro() {
        let (svc, _dir) = shared();
        let id = session_id(&svc).await;

        let json = body_json(acao(State(svc.clone()), acao_body(&id, "atacar")).await).await;
        assert_eq!(json["sucesso"], false);
        assert!(json["erro"].as_str().is_some());

        let resp = acao(
            State(svc),
            Ok(Json(ActionBody {
                session_id: Some(id),
                action: None,
            })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["erro"], DADOS_INVALIDOS);
    }

    #[tokio::test]
    async fn explorar_and_personagens_use_the_client_shape() {
        let (svc, _dir) = shared();
        let id = session_id(&svc).await;

        // Default dice roll the lowest value: an encounter one step down.
        let query = ExploreQuery {
            session_id: Some(id),
            direction: Some("baixo".into()),
        };
        let json = body_json(explorar(State(svc.clone()), Query(query)).await).await;
        assert_eq!(json["sucesso"], true);
        assert_eq!(json["pos_x"], 0);
        assert_eq!(json["pos_y"], 1);
        assert_eq!(json["evento"], "monstro");
        assert_eq!(json["hp_monstro"], 100);
        assert!(json["descricao"].as_str().is_some());

        let json = body_json(personagens(State(svc)).await).await;
        assert_eq!(json["sucesso"], true);
        assert_eq!(json["personagens"][0]["nome"], "Arthas");
        assert_eq!(json["personagens"][0]["classe"], "Guerreiro");
    }
}
