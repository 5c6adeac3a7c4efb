//! Tests the move generator against known variation counts
//
//  Copyright 2020 Michael Leany
//
//  This Source Code Form is subject to the terms of the Mozilla Public
//  License, v. 2.0. If a copy of the MPL was not distributed with this
//  file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
////////////////////////////////////////////////////////////////////////////////////////////////////

mod move_gen {
    use scarecrow::chess::{variations, Position};

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn count(fen: &str, depth: usize) -> u64 {
        let mut pos: Position = fen.parse().expect("valid FEN");
        let before = pos.to_fen_str();
        let count = variations::count(&mut pos, depth);
        assert_eq!(pos.to_fen_str(), before);
        count
    }

    mod start_position {
        use super::{count, START};

        #[test]
        fn shallow() {
            assert_eq!(count(START, 1), 20);
            assert_eq!(count(START, 2), 400);
            assert_eq!(count(START, 3), 8902);
        }

        #[test]
        fn depth_4() { assert_eq!(count(START, 4), 197281); }

        #[test]
        fn depth_5() { assert_eq!(count(START, 5), 4865609); }

        #[test]
        #[ignore]
        fn depth_6() { assert_eq!(count(START, 6), 119060324); }
    }

    mod kiwipete {
        use super::{count, KIWIPETE};

        #[test]
        fn shallow() {
            assert_eq!(count(KIWIPETE, 1), 48);
            assert_eq!(count(KIWIPETE, 2), 2039);
            assert_eq!(count(KIWIPETE, 3), 97862);
        }

        #[test]
        fn depth_4() { assert_eq!(count(KIWIPETE, 4), 4085603); }

        #[test]
        #[ignore]
        fn depth_5() { assert_eq!(count(KIWIPETE, 5), 193690690); }
    }

    #[test]
    fn rook_endgame_with_en_passant() {
        let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
        assert_eq!(count(fen, 1), 14);
        assert_eq!(count(fen, 3), 2812);
        assert_eq!(count(fen, 5), 674624);
    }

    #[test]
    fn promotions_and_castling() {
        let fen = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
        assert_eq!(count(fen, 1), 6);
        assert_eq!(count(fen, 2), 264);
        assert_eq!(count(fen, 4), 422333);
    }

    #[test]
    fn discovered_checks() {
        let fen = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
        assert_eq!(count(fen, 1), 44);
        assert_eq!(count(fen, 3), 62379);
    }

    #[test]
    fn middlegame() {
        let fen = "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";
        assert_eq!(count(fen, 1), 46);
        assert_eq!(count(fen, 3), 89890);
    }

    #[test]
    fn castling() {
        assert_eq!(count("4k3/8/8/8/8/8/8/4K2R w K - 0 1", 6), 764643);
        assert_eq!(count("4k3/8/8/8/8/8/8/R3K3 w Q - 0 1", 6), 846648);
        assert_eq!(count("4k2r/8/8/8/8/8/8/4K3 b k - 0 1", 6), 764643);
        assert_eq!(count("r3k3/8/8/8/8/8/8/4K3 b q - 0 1", 6), 846648);
        assert_eq!(count("8/8/8/8/8/8/6k1/4K2R w K - 0 1", 6), 185867);
        assert_eq!(count("r3k3/1K6/8/8/8/8/8/8 w q - 0 1", 6), 367724);
    }

    #[test]
    #[ignore]
    fn castling_with_rooks() {
        assert_eq!(count("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", 6), 179862938);
        assert_eq!(count("r3k2r/8/8/8/8/8/8/1R2K2R b Kkq - 0 1", 6), 198328929);
    }

    #[test]
    fn knights() {
        assert_eq!(count("8/1k6/8/5N2/8/4n3/8/2K5 w - - 0 1", 6), 2594412);
        assert_eq!(count("K7/8/2n5/1n6/8/8/8/k6N w - - 0 1", 6), 588695);
        assert_eq!(count("k7/8/2N5/1N6/8/8/8/K6n b - - 0 1", 6), 588695);
    }

    #[test]
    fn bishops() {
        assert_eq!(count("k7/B7/1B6/1B6/8/8/8/K6b w - - 0 1", 6), 7881673);
        assert_eq!(count("K7/b7/1b6/1b6/8/8/8/k6B w - - 0 1", 6), 7382896);
    }

    #[test]
    fn queens() {
        assert_eq!(count("6kq/8/8/8/8/8/8/7K w - - 0 1", 6), 391507);
        assert_eq!(count("6qk/8/8/8/8/8/8/7K b - - 0 1", 6), 419369);
        assert_eq!(count("K7/8/8/3Q4/4q3/8/8/7k w - - 0 1", 6), 3370175);
    }

    #[test]
    fn pawns() {
        assert_eq!(count("8/8/8/8/8/K7/P7/k7 w - - 0 1", 6), 6249);
        assert_eq!(count("K7/p7/k7/8/8/8/8/8 w - - 0 1", 6), 2343);
        assert_eq!(count("8/2k1p3/3pP3/3P2K1/8/8/8/8 w - - 0 1", 6), 34834);
        assert_eq!(count("8/2k1p3/3pP3/3P2K1/8/8/8/8 b - - 0 1", 6), 34822);
        assert_eq!(count("8/3k4/3p4/8/3P4/3K4/8/8 w - - 0 1", 6), 157093);
        assert_eq!(count("k7/8/3p4/8/3P4/8/8/7K b - - 0 1", 6), 21104);
        assert_eq!(count("3k4/3pp3/8/8/8/8/3PP3/3K4 w - - 0 1", 6), 199002);
    }

    #[test]
    fn en_passant() {
        assert_eq!(count("k7/8/8/7p/6P1/8/8/K7 w - - 0 1", 6), 41874);
        assert_eq!(count("7k/8/8/1p6/P7/8/8/7K b - - 0 1", 6), 41874);
        assert_eq!(count("k7/8/8/3p4/4p3/8/8/7K b - - 0 1", 6), 22579);
        assert_eq!(count("7k/3p4/8/8/3P4/8/8/K7 b - - 0 1", 6), 32167);
    }

    #[test]
    fn promotions() {
        assert_eq!(count("8/Pk6/8/8/8/8/6Kp/8 w - - 0 1", 6), 1030499);
        assert_eq!(count("8/PPPk4/8/8/8/8/4Kppp/8 b - - 0 1", 6), 28859283);
    }

    #[test]
    #[ignore]
    fn promotions_with_knights() {
        assert_eq!(count("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N w - - 0 1", 6), 71179139);
    }
}
