use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse};

#[get("/balance/{address}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;

    let (balance, count) = {
        let node = state.node.lock().expect("mutex poisoned");
        let utxos = node.utxos();
        let count = utxos.iter().filter(|(_, out)| out.address == address).count();
        (utxos.balance_of(&address), count)
    };

    HttpResponse::Ok().json(BalanceResponse {
        address,
        balance,
        utxos: count,
    })
}
