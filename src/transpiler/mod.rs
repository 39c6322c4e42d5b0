//! Declaration ↔ Pseudocode Transpiler
//!
//! The trick that lets a JS-grammar-only bundling engine bundle declaration
//! content: each declaration statement is losslessly encoded as an
//! executable-looking JS statement (import/export syntax kept as genuine
//! module edges, everything else tokenized into an opaque array literal),
//! and the engine's output is decoded back into valid declaration syntax.
//!
//! The round trip is lossless: `decode(bundle(encode(X)))` preserves every
//! declared symbol name and every import/export specifier of `X`.

pub mod decode;
pub mod encode;
pub mod statement;
pub mod tokens;

pub use decode::pseudocode_to_dts;
pub use encode::dts_to_pseudocode;

#[cfg(test)]
mod tests {
    use super::*;

    /// Identity bundling: encode then immediately decode, no engine pass.
    fn round_trip(dts: &str) -> String {
        pseudocode_to_dts(&dts_to_pseudocode(dts))
    }

    #[test]
    fn round_trip_preserves_declared_symbols() {
        let dts = "\
import type { Base } from './base';
interface User { id: number; name: string }
export declare function getUserName(user: User): string;
export type Role = 'admin' | 'user';
export declare const VERSION: string;
export { User };
";
        let decoded = round_trip(dts);
        assert!(decoded.contains("interface User { id: number; name: string }"));
        assert!(decoded.contains("declare function getUserName(user: User): string;"));
        assert!(decoded.contains("type Role = 'admin' | 'user';"));
        assert!(decoded.contains("declare const VERSION: string;"));
        assert!(decoded.contains("import { Base } from './base';"));
        assert!(decoded.contains("export { User };"));
        assert!(decoded.contains("export { getUserName };"));
    }

    #[test]
    fn round_trip_preserves_statement_text_verbatim() {
        let dts = "declare function pick<T, K extends keyof T>(obj: T, keys: K[]): Pick<T, K>;\n";
        let decoded = round_trip(dts);
        assert!(
            decoded.contains("declare function pick<T, K extends keyof T>(obj: T, keys: K[]): Pick<T, K>;"),
            "complex generic signature must survive the round trip: {decoded}"
        );
    }

    #[test]
    fn round_trip_keeps_default_export() {
        let dts = "export default interface Config { verbose: boolean }\n";
        let decoded = round_trip(dts);
        assert!(decoded.contains("interface Config { verbose: boolean }"));
        assert!(decoded.contains("export { Config as default };"));
    }

    #[test]
    fn round_trip_handles_enum_and_namespace() {
        let dts = "\
export declare enum Level { Debug = 0, Info = 1 }
declare namespace internal { const token: string; }
";
        let decoded = round_trip(dts);
        assert!(decoded.contains("declare enum Level { Debug = 0, Info = 1 }"));
        assert!(decoded.contains("declare namespace internal { const token: string; }"));
        assert!(decoded.contains("export { Level };"));
    }
}
